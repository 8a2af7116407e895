//! Generates the `notary.Notary` and `notary.Sync` service stubs.
//!
//! Messages live in `notary-proto` as hand-written prost types, so the
//! services are declared with the manual builder and no `protoc` is needed.

use std::error::Error;
use std::path::PathBuf;

use tonic_build::manual::{Builder, Method, Service};

fn method(name: &str, route: &str, input: &str, output: &str, streaming: bool) -> Method {
    let builder = Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("notary_proto::{input}"))
        .output_type(format!("notary_proto::{output}"))
        .codec_path("tonic::codec::ProstCodec");
    if streaming {
        builder.server_streaming().build()
    } else {
        builder.build()
    }
}

/// The generated `Sync` server trait spells its bounds as `Send + Sync`,
/// which would name the trait itself. Qualify the marker.
fn qualify_marker_sync(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(found) = rest.find("+ Sync") {
        let (head, tail) = rest.split_at(found);
        out.push_str(head);
        let after = tail.strip_prefix("+ Sync").unwrap_or(tail);
        let continues_ident = after
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if continues_ident {
            out.push_str("+ Sync");
        } else {
            out.push_str("+ std::marker::Sync");
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

fn main() -> Result<(), Box<dyn Error>> {
    let notary = Service::builder()
        .name("Notary")
        .package("notary")
        .method(method("grant", "Grant", "GrantRequest", "GrantResponse", false))
        .method(method("revoke", "Revoke", "RevokeRequest", "RevokeResponse", false))
        .method(method("refresh", "Refresh", "RefreshRequest", "RefreshResponse", false))
        .method(method("search", "Search", "SearchRequest", "SearchResponse", true))
        .build();

    let sync = Service::builder()
        .name("Sync")
        .package("notary")
        .method(method("stream", "Stream", "SyncRequest", "SyncStream", true))
        .build();

    Builder::new().compile(&[notary, sync]);

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let generated = out_dir.join("notary.Sync.rs");
    let source = std::fs::read_to_string(&generated)?;
    std::fs::write(&generated, qualify_marker_sync(&source))?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
