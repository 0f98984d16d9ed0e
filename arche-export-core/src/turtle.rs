//! Turtle on the wire: serialising graphs and reading search results.

use rio_api::formatter::TriplesFormatter;
use rio_api::model::{Literal, NamedNode, Subject, Term, Triple};
use rio_api::parser::TriplesParser;
use rio_turtle::{TurtleError, TurtleFormatter, TurtleParser};

use crate::graph::{Graph, ResourceNode, ValueKind};
use crate::vocabulary::{Vocabulary, RDF_TYPE};

/// Serialise every node of the graph, the primary node first.
pub fn to_turtle(graph: &Graph, vocabulary: &Vocabulary) -> Result<String, std::io::Error> {
    let mut formatter = TurtleFormatter::new(Vec::default());
    for node in graph.nodes() {
        format_node(&mut formatter, node, vocabulary)?;
    }
    let bytes = formatter.finish()?;
    String::from_utf8(bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

fn format_node(
    formatter: &mut TurtleFormatter<Vec<u8>>,
    node: &ResourceNode,
    vocabulary: &Vocabulary,
) -> Result<(), std::io::Error> {
    let subject = Subject::NamedNode(NamedNode { iri: node.uri() });
    let class = vocabulary.class(node.resource_type());
    formatter.format(&Triple {
        subject,
        predicate: NamedNode { iri: RDF_TYPE },
        object: Term::NamedNode(NamedNode { iri: &class }),
    })?;

    for statement in node.statements() {
        let predicate = vocabulary.property(&statement.property);
        let object = match &statement.kind {
            ValueKind::Plain => Term::Literal(Literal::Simple {
                value: &statement.value,
            }),
            ValueKind::Lang(language) => Term::Literal(Literal::LanguageTaggedString {
                value: &statement.value,
                language,
            }),
            ValueKind::Typed(datatype) => Term::Literal(Literal::Typed {
                value: &statement.value,
                datatype: NamedNode { iri: datatype },
            }),
            ValueKind::Reference => Term::NamedNode(NamedNode {
                iri: &statement.value,
            }),
        };
        formatter.format(&Triple {
            subject,
            predicate: NamedNode { iri: &predicate },
            object,
        })?;
    }
    Ok(())
}

/// Subjects that carry `property` with an object equal to `value`, in document
/// order. Both IRI and literal objects are compared by their lexical value.
pub fn subjects_with(turtle: &str, property: &str, value: &str) -> Result<Vec<String>, TurtleError> {
    let mut subjects: Vec<String> = Vec::new();
    let mut parser = TurtleParser::new(turtle.as_bytes(), None);
    parser.parse_all(&mut |triple: Triple<'_>| -> Result<(), TurtleError> {
        if triple.predicate.iri != property {
            return Ok(());
        }
        let object = match triple.object {
            Term::NamedNode(node) => node.iri,
            Term::Literal(Literal::Simple { value: lexical })
            | Term::Literal(Literal::LanguageTaggedString { value: lexical, .. })
            | Term::Literal(Literal::Typed { value: lexical, .. }) => lexical,
            _ => return Ok(()),
        };
        if object != value {
            return Ok(());
        }
        if let Subject::NamedNode(node) = triple.subject {
            if !subjects.iter().any(|known| known == node.iri) {
                subjects.push(node.iri.to_string());
            }
        }
        Ok(())
    })?;
    Ok(subjects)
}
