//! SDL rendering of the output [Document](crate::ir::Document).

use crate::ir::*;
use std::fmt;

const INDENT: &str = "    ";

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut definitions = self.definitions.iter().peekable();

        while let Some(definition) = definitions.next() {
            match definition {
                Definition::SchemaExtension(extension) => render_schema_extension(extension, f)?,
                Definition::Directive(directive) => render_directive_definition(directive, f)?,
                Definition::Scalar(scalar) => writeln!(f, "scalar {}", scalar.name)?,
                Definition::Enum(r#enum) => render_enum(r#enum, f)?,
                Definition::Interface(interface) => render_interface(interface, f)?,
                Definition::Object(object) => render_object(object, f)?,
            }

            if definitions.peek().is_some() {
                f.write_str("\n")?;
            }
        }

        Ok(())
    }
}

fn render_schema_extension(extension: &SchemaExtension, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("extend schema")?;

    for directive in &extension.directives {
        write!(f, "\n{INDENT}{directive}")?;
    }

    f.write_str("\n")
}

fn render_directive_definition(directive: &DirectiveDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "directive @{}", directive.name)?;
    render_arguments(&directive.arguments, f)?;

    if directive.repeatable {
        f.write_str(" repeatable")?;
    }

    write!(f, " on {}", directive.locations.join(" | "))?;
    f.write_str("\n")
}

fn render_enum(r#enum: &EnumDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "enum {} {{", r#enum.name)?;

    for value in &r#enum.values {
        write!(f, "{INDENT}{}", value.name)?;
        for directive in &value.directives {
            write!(f, " {directive}")?;
        }
        f.write_str("\n")?;
    }

    f.write_str("}\n")
}

fn render_interface(interface: &InterfaceDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "interface {} {{", interface.name)?;
    render_fields(&interface.fields, f)?;
    f.write_str("}\n")
}

fn render_object(object: &ObjectDefinition, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if object.extend {
        f.write_str("extend ")?;
    }

    write!(f, "type {}", object.name)?;

    if !object.implements.is_empty() {
        write!(f, " implements {}", object.implements.join(" & "))?;
    }

    for directive in &object.directives {
        write!(f, " {directive}")?;
    }

    f.write_str(" {\n")?;
    render_fields(&object.fields, f)?;
    f.write_str("}\n")
}

fn render_fields(fields: &[Field], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for field in fields {
        write!(f, "{INDENT}{}", field.name)?;
        render_arguments(&field.arguments, f)?;
        write!(f, ": {}", field.ty)?;

        for directive in &field.directives {
            write!(f, " {directive}")?;
        }

        f.write_str("\n")?;
    }

    Ok(())
}

fn render_arguments(arguments: &[InputValue], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if arguments.is_empty() {
        return Ok(());
    }

    f.write_str("(")?;

    let mut arguments = arguments.iter().peekable();
    while let Some(argument) = arguments.next() {
        write!(f, "{}: {}", argument.name, argument.ty)?;
        if arguments.peek().is_some() {
            f.write_str(", ")?;
        }
    }

    f.write_str(")")
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;

        if self.arguments.is_empty() {
            return Ok(());
        }

        f.write_str("(")?;

        let mut arguments = self.arguments.iter().peekable();
        while let Some((name, value)) = arguments.next() {
            write!(f, "{name}: {value}")?;
            if arguments.peek().is_some() {
                f.write_str(", ")?;
            }
        }

        f.write_str(")")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write_quoted(f, s),
            Value::List(values) => {
                f.write_str("[")?;
                let mut values = values.iter().peekable();
                while let Some(value) = values.next() {
                    value.fmt(f)?;
                    if values.peek().is_some() {
                        f.write_str(", ")?;
                    }
                }
                f.write_str("]")
            }
        }
    }
}

fn write_quoted(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '\r' => f.write_str("\\r"),
            '\n' => f.write_str("\\n"),
            '\t' => f.write_str("\\t"),
            '\\' => f.write_str("\\\\"),
            '"' => f.write_str("\\\""),
            c if c.is_control() => write!(f, "\\u{:04}", c as u32),
            c => f.write_char(c),
        }?
    }
    f.write_char('"')
}
