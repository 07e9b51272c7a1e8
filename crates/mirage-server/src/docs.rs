//! Markdown documentation for the configured endpoints.

use mirage_core::EndpointDefinition;
use std::fmt::Write;

/// Path of the built-in documentation route.
pub const DOCS_PATH: &str = "/docs";

/// Content type of the documentation response.
pub const DOCS_CONTENT_TYPE: &str = "text/markdown";

/// Render a summary list followed by one section per endpoint.
///
/// Implementation notes and store details are never included.
pub fn render_docs<'a>(endpoints: impl IntoIterator<Item = &'a EndpointDefinition>) -> String {
    let endpoints: Vec<&EndpointDefinition> = endpoints.into_iter().collect();
    let mut out = String::from("# API Documentation\n\n");
    if endpoints.is_empty() {
        return out;
    }

    out.push_str("## API Endpoints\n\n");
    for endpoint in &endpoints {
        let _ = writeln!(
            out,
            "- **{}** - {} - {}",
            endpoint.method, endpoint.path, endpoint.description
        );
    }
    out.push('\n');

    out.push_str("## API Definitions\n\n");
    for endpoint in &endpoints {
        let _ = write!(
            out,
            "### API: {}\n#### HTTP Method\n{}\n#### Path\n{}\n#### Description\n{}\n",
            endpoint.name, endpoint.method, endpoint.path, endpoint.description
        );
    }

    out
}
