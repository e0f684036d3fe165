//! Intermediate representation of the synthesized schema document. Assembly
//! builds it in conceptual order, the canonical sort reorders it, and
//! rendering prints it as SDL.

pub(crate) struct Document {
    pub(crate) definitions: Vec<Definition>,
}

pub(crate) enum Definition {
    SchemaExtension(SchemaExtension),
    Directive(DirectiveDefinition),
    Scalar(ScalarDefinition),
    Enum(EnumDefinition),
    Interface(InterfaceDefinition),
    Object(ObjectDefinition),
}

impl Definition {
    pub(crate) fn name(&self) -> Option<&str> {
        match self {
            Definition::SchemaExtension(_) => None,
            Definition::Directive(directive) => Some(&directive.name),
            Definition::Scalar(scalar) => Some(&scalar.name),
            Definition::Enum(r#enum) => Some(&r#enum.name),
            Definition::Interface(interface) => Some(&interface.name),
            Definition::Object(object) => Some(&object.name),
        }
    }

    pub(crate) fn kind_rank(&self) -> u8 {
        match self {
            Definition::SchemaExtension(_) => 0,
            Definition::Directive(_) => 1,
            Definition::Scalar(_) => 2,
            Definition::Enum(_) => 3,
            Definition::Interface(_) => 4,
            Definition::Object(_) => 5,
        }
    }
}

pub(crate) struct SchemaExtension {
    pub(crate) directives: Vec<Directive>,
}

pub(crate) struct DirectiveDefinition {
    pub(crate) name: String,
    pub(crate) arguments: Vec<InputValue>,
    pub(crate) repeatable: bool,
    pub(crate) locations: Vec<String>,
}

pub(crate) struct ScalarDefinition {
    pub(crate) name: String,
}

pub(crate) struct EnumDefinition {
    pub(crate) name: String,
    pub(crate) values: Vec<EnumValue>,
}

pub(crate) struct EnumValue {
    pub(crate) name: String,
    pub(crate) directives: Vec<Directive>,
}

pub(crate) struct InterfaceDefinition {
    pub(crate) name: String,
    pub(crate) fields: Vec<Field>,
}

pub(crate) struct ObjectDefinition {
    pub(crate) name: String,
    pub(crate) extend: bool,
    pub(crate) implements: Vec<String>,
    pub(crate) directives: Vec<Directive>,
    pub(crate) fields: Vec<Field>,
}

pub(crate) struct Field {
    pub(crate) name: String,
    pub(crate) arguments: Vec<InputValue>,
    pub(crate) ty: String,
    pub(crate) directives: Vec<Directive>,
}

pub(crate) struct InputValue {
    pub(crate) name: String,
    pub(crate) ty: String,
}

pub(crate) struct Directive {
    pub(crate) name: String,
    pub(crate) arguments: Vec<(String, Value)>,
}

impl Directive {
    pub(crate) fn new(name: &str) -> Directive {
        Directive {
            name: name.to_owned(),
            arguments: Vec::new(),
        }
    }

    pub(crate) fn with_arg(name: &str, arg_name: &str, value: Value) -> Directive {
        Directive {
            name: name.to_owned(),
            arguments: vec![(arg_name.to_owned(), value)],
        }
    }
}

pub(crate) enum Value {
    String(String),
    List(Vec<Value>),
}
