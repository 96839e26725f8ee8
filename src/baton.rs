//! Server-side session state for the pipeline connection.

/// Opaque token returned by the server that ties the next pipeline request
/// to the same server-side stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Baton(pub String);

/// An open stream: the baton to present and, if the server asked for it,
/// the base URL subsequent requests must go to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) baton: Option<Baton>,
    pub(crate) base_url: Option<String>,
}

impl Session {
    /// Applies the stream fields of a response. The server may rotate the
    /// baton on every request.
    pub(crate) fn update(&mut self, baton: Option<String>, base_url: Option<String>) {
        self.baton = baton.map(Baton);
        if base_url.is_some() {
            self.base_url = base_url;
        }
    }

    pub(crate) fn baton_value(&self) -> Option<String> {
        self.baton.as_ref().map(|baton| baton.0.clone())
    }
}
