//! Schema bootstrap
//!
//! Describes a type taxonomy as ordinary nodes. Every declared type
//! becomes a node typed by the root `type` node:
//!
//! | Attribute        | Value                                  |
//! |------------------|----------------------------------------|
//! | `__name__`       | type name                              |
//! | `__isinstance__` | ref of the `type` node                 |
//! | `__bases__`      | list of base type refs                 |
//! | `__fields__`     | map field name -> field type ref       |
//! | `__abstract__`   | bool                                   |
//!
//! ```
//! use ygg_graph::{Runtime, SchemaBuilder, TypeDecl};
//!
//! let mut rt = Runtime::new();
//! let branch = rt.create_branch().unwrap();
//! let wc = rt.get_branch(branch).unwrap().wc();
//!
//! let mut schema = SchemaBuilder::new(&mut rt, wc).unwrap();
//! schema.declare(&mut rt, &TypeDecl::new("string")).unwrap();
//! schema.declare(&mut rt, &TypeDecl::new("person").field("name", "string")).unwrap();
//! assert!(schema.type_ref("person").is_some());
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{GraphError, Result};
use crate::id::{NodeRef, RevisionId};
use crate::node::TYPE_ATTRIBUTE;
use crate::proxy::NodeProxy;
use crate::runtime::Runtime;
use crate::value::Value;

/// Type name
pub const NAME_ATTRIBUTE: &str = "__name__";
/// Base type refs
pub const BASES_ATTRIBUTE: &str = "__bases__";
/// Field name to field type ref
pub const FIELDS_ATTRIBUTE: &str = "__fields__";
/// Whether the type is abstract
pub const ABSTRACT_ATTRIBUTE: &str = "__abstract__";

/// Name of the root metatype
pub const TYPE_TYPE: &str = "type";

/// Declarative description of one type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeDecl {
    pub name: String,
    pub bases: Vec<String>,
    /// `(field name, field type name)`
    pub fields: Vec<(String, String)>,
    pub is_abstract: bool,
}

impl TypeDecl {
    /// Concrete type with no bases or fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a base type by name
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.bases.push(name.into());
        self
    }

    /// Add a field typed by name
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push((name.into(), type_name.into()));
        self
    }

    /// Mark the type abstract
    pub fn mark_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

/// Issues the node writes for a list of [`TypeDecl`]s into one revision
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    revision: RevisionId,
    type_type: NodeRef,
    types: BTreeMap<String, NodeRef>,
}

impl SchemaBuilder {
    /// Create the root `type` node (an instance of itself) in `revision`
    pub fn new(rt: &mut Runtime, revision: RevisionId) -> Result<Self> {
        let root = rt.create_node(revision)?;
        root.set(rt, NAME_ATTRIBUTE, TYPE_TYPE)?;
        root.set(rt, TYPE_ATTRIBUTE, root.node_ref())?;
        root.set(rt, BASES_ATTRIBUTE, Vec::<Value>::new())?;
        root.set(rt, ABSTRACT_ATTRIBUTE, false)?;

        let mut types = BTreeMap::new();
        types.insert(TYPE_TYPE.to_owned(), root.node_ref());
        Ok(Self {
            revision,
            type_type: root.node_ref(),
            types,
        })
    }

    /// Declare every type in order
    pub fn build(rt: &mut Runtime, revision: RevisionId, decls: &[TypeDecl]) -> Result<Self> {
        let mut builder = Self::new(rt, revision)?;
        for decl in decls {
            builder.declare(rt, decl)?;
        }
        Ok(builder)
    }

    /// Create the node for `decl`. Bases and field types must already be
    /// declared; a field may refer to the type being declared.
    pub fn declare(&mut self, rt: &mut Runtime, decl: &TypeDecl) -> Result<NodeProxy> {
        let bases = decl
            .bases
            .iter()
            .map(|name| self.resolve(name).map(Value::NodeRef))
            .collect::<Result<Vec<_>>>()?;

        // None marks a self reference, filled in once the node exists
        let field_types = decl
            .fields
            .iter()
            .map(|(field, type_name)| {
                let type_ref = if *type_name == decl.name {
                    None
                } else {
                    Some(self.resolve(type_name)?)
                };
                Ok((field.clone(), type_ref))
            })
            .collect::<Result<Vec<_>>>()?;

        let node = rt.create_node(self.revision)?;
        let fields: BTreeMap<_, _> = field_types
            .into_iter()
            .map(|(field, type_ref)| (field, Value::NodeRef(type_ref.unwrap_or(node.node_ref()))))
            .collect();

        node.set(rt, NAME_ATTRIBUTE, decl.name.as_str())?;
        node.set(rt, TYPE_ATTRIBUTE, self.type_type())?;
        node.set(rt, BASES_ATTRIBUTE, bases)?;
        node.set(rt, FIELDS_ATTRIBUTE, fields)?;
        node.set(rt, ABSTRACT_ATTRIBUTE, decl.is_abstract)?;

        self.types.insert(decl.name.clone(), node.node_ref());
        debug!(revision = %self.revision, name = %decl.name, node = %node.node_ref(), "type declared");
        Ok(node)
    }

    fn resolve(&self, name: &str) -> Result<NodeRef> {
        self.type_ref(name)
            .ok_or_else(|| GraphError::UnknownType(name.to_owned()))
    }

    /// Node of the declared type `name`
    pub fn type_ref(&self, name: &str) -> Option<NodeRef> {
        self.types.get(name).copied()
    }

    /// Ref of the root `type` node
    pub fn type_type(&self) -> NodeRef {
        self.type_type
    }

    /// Revision the schema is written into
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    /// Declared types by name
    pub fn types(&self) -> &BTreeMap<String, NodeRef> {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> (Runtime, RevisionId) {
        let mut rt = Runtime::new();
        let branch = rt.create_branch().unwrap();
        let wc = rt.get_branch(branch).unwrap().wc();
        (rt, wc)
    }

    fn taxonomy() -> Vec<TypeDecl> {
        vec![
            TypeDecl::new("string"),
            TypeDecl::new("boolean"),
            TypeDecl::new("node").field("__name__", "string"),
            TypeDecl::new("field").base("node").mark_abstract(),
            TypeDecl::new("person")
                .base("node")
                .field("name", "string")
                .field("alive", "boolean")
                .field("parent", "person"),
        ]
    }

    #[test]
    fn test_root_type_is_its_own_instance() {
        let (mut rt, wc) = open();
        let schema = SchemaBuilder::new(&mut rt, wc).unwrap();
        let root = rt.node(wc, schema.type_type()).unwrap();
        assert_eq!(root.get(&rt, TYPE_ATTRIBUTE).unwrap(), Value::NodeRef(schema.type_type()));
        assert_eq!(root.get(&rt, NAME_ATTRIBUTE).unwrap(), Value::from(TYPE_TYPE));
    }

    #[test]
    fn test_build_taxonomy() {
        let (mut rt, wc) = open();
        let schema = SchemaBuilder::build(&mut rt, wc, &taxonomy()).unwrap();
        assert_eq!(schema.types().len(), 6);

        let person_ref = schema.type_ref("person").unwrap();
        let person = rt.node(wc, person_ref).unwrap();
        assert_eq!(person.get(&rt, TYPE_ATTRIBUTE).unwrap(), Value::NodeRef(schema.type_type()));
        assert_eq!(
            person.get(&rt, BASES_ATTRIBUTE).unwrap(),
            Value::List(vec![Value::NodeRef(schema.type_ref("node").unwrap())])
        );
        let fields = person.dict(&rt, FIELDS_ATTRIBUTE).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("parent"), Some(&Value::NodeRef(person_ref)));
        assert_eq!(fields.get("alive"), Some(&Value::NodeRef(schema.type_ref("boolean").unwrap())));
        assert_eq!(person.get(&rt, ABSTRACT_ATTRIBUTE).unwrap(), Value::from(false));

        let field = rt.node(wc, schema.type_ref("field").unwrap()).unwrap();
        assert_eq!(field.get(&rt, ABSTRACT_ATTRIBUTE).unwrap(), Value::from(true));
    }

    #[test]
    fn test_unknown_base_rejected() {
        let (mut rt, wc) = open();
        let mut schema = SchemaBuilder::new(&mut rt, wc).unwrap();
        let err = schema.declare(&mut rt, &TypeDecl::new("cat").base("animal")).unwrap_err();
        assert!(matches!(err, GraphError::UnknownType(name) if name == "animal"));
        assert!(schema.type_ref("cat").is_none());
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let (mut rt, wc) = open();
        let mut schema = SchemaBuilder::new(&mut rt, wc).unwrap();
        let before = rt.get_revision(wc).unwrap().nodes().len();
        let decl = TypeDecl::new("cat").field("toy", "ball");
        assert!(matches!(schema.declare(&mut rt, &decl), Err(GraphError::UnknownType(_))));
        assert_eq!(rt.get_revision(wc).unwrap().nodes().len(), before);
    }

    #[test]
    fn test_schema_is_versioned() {
        let (mut rt, wc) = open();
        let schema = SchemaBuilder::build(&mut rt, wc, &taxonomy()).unwrap();
        let branch = wc.branch();
        rt.commit(branch).unwrap();

        let next = rt.get_branch(branch).unwrap().wc();
        let person = rt.node(next, schema.type_ref("person").unwrap()).unwrap();
        person.set(&mut rt, ABSTRACT_ATTRIBUTE, true).unwrap();

        let old = rt.node(wc, schema.type_ref("person").unwrap()).unwrap();
        assert_eq!(old.get(&rt, ABSTRACT_ATTRIBUTE).unwrap(), Value::from(false));
    }

    #[test]
    fn test_finished_revision_rejected() {
        let (mut rt, wc) = open();
        rt.commit(wc.branch()).unwrap();
        assert!(matches!(SchemaBuilder::new(&mut rt, wc), Err(GraphError::RevisionFinished(_))));
    }
}
