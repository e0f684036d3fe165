//! Canonical ordering of the assembled document, so that repeated synthesis
//! over unchanged input is byte-identical regardless of subgraph ordering.

use crate::ir::*;

/// Total order over the document: unnamed top-level nodes first, grouped by
/// kind; then named definitions by name ascending. Within a type the
/// identifier field sorts first, everything else alphabetically. Directive,
/// argument and enum-variant lists are sorted recursively.
pub(crate) fn sort_document(document: &mut Document, id_field_name: &str) {
    for definition in &mut document.definitions {
        match definition {
            Definition::SchemaExtension(extension) => sort_directives(&mut extension.directives),
            Definition::Directive(directive) => {
                directive.arguments.sort_by(|a, b| a.name.cmp(&b.name));
                directive.locations.sort();
            }
            Definition::Scalar(_) => (),
            Definition::Enum(r#enum) => {
                for value in &mut r#enum.values {
                    sort_directives(&mut value.directives);
                }
                r#enum.values.sort_by(|a, b| a.name.cmp(&b.name));
            }
            Definition::Interface(interface) => sort_fields(&mut interface.fields, id_field_name),
            Definition::Object(object) => {
                object.implements.sort();
                sort_directives(&mut object.directives);
                sort_fields(&mut object.fields, id_field_name);
            }
        }
    }

    document
        .definitions
        .sort_by(|a, b| definition_sort_key(a).cmp(&definition_sort_key(b)));
}

fn definition_sort_key(definition: &Definition) -> (bool, String, u8) {
    match definition.name() {
        // Named nodes, by name; the kind disambiguates a directive definition
        // sharing its name with a type.
        Some(name) => (true, name.to_owned(), definition.kind_rank()),
        // Unnamed nodes first, grouped by kind.
        None => (false, String::new(), definition.kind_rank()),
    }
}

fn sort_fields(fields: &mut [Field], id_field_name: &str) {
    for field in fields.iter_mut() {
        field.arguments.sort_by(|a, b| a.name.cmp(&b.name));
        sort_directives(&mut field.directives);
    }

    fields.sort_by_key(|field| (field.name != id_field_name, field.name.clone()));
}

fn sort_directives(directives: &mut [Directive]) {
    for directive in directives.iter_mut() {
        for (_, value) in &mut directive.arguments {
            sort_value(value);
        }
        directive.arguments.sort_by(|a, b| a.0.cmp(&b.0));
    }

    // The rendered form as a tiebreaker makes this a total order even for
    // repeated directives like @tag.
    directives.sort_by_key(|directive| (directive.name.clone(), directive.to_string()));
}

fn sort_value(value: &mut Value) {
    if let Value::List(values) = value {
        for value in values.iter_mut() {
            sort_value(value);
        }
        values.sort_by_key(|value| value.to_string());
    }
}
