use crate::Diagnostics;

/// The synthesized subgraph: a canonical SDL document implementing global
/// object identification over the input subgraphs.
#[derive(Debug)]
pub struct SynthesizedSubgraph {
    /// The subgraph name the document was generated under.
    pub name: String,
    /// The rendered, canonically sorted schema text.
    pub sdl: String,
}

/// The result of a [`synthesize()`](crate::synthesize()) invocation.
pub struct SynthesisResult {
    pub(crate) schema: Option<SynthesizedSubgraph>,
    pub(crate) diagnostics: Diagnostics,
}

impl SynthesisResult {
    /// Simplify the result data to a yes-no answer: did synthesis succeed?
    ///
    /// `Ok()` contains the [SynthesizedSubgraph].
    /// `Err()` contains all [Diagnostics].
    pub fn into_result(self) -> Result<SynthesizedSubgraph, Diagnostics> {
        match self.schema {
            Some(schema) => Ok(schema),
            // means a fatal error occurred
            None => Err(self.diagnostics),
        }
    }

    /// Synthesis warnings and errors.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}
