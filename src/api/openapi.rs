use super::handlers::{auth_hook, health, prelogin_hook};
use crate::authz::grant::{Grant, VirtualFolder};
use utoipa::openapi::{Contact, Info, InfoBuilder, License};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(health::health, auth_hook::auth_hook, prelogin_hook::prelogin_hook),
    components(schemas(
        health::Health,
        auth_hook::AuthHookRequest,
        auth_hook::AuthHookResponse,
        prelogin_hook::PreLoginRequest,
        Grant,
        VirtualFolder
    )),
    tags(
        (name = "health", description = "Service and session store health"),
        (name = "hooks", description = "SFTPGo authentication and pre-login hooks")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

fn cargo_info() -> Info {
    // Cargo.toml metadata instead of the derive defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = match primary.find('<') {
        Some(start) => (
            optional_str(&primary[..start]),
            optional_str(primary[start + 1..].trim_end_matches('>')),
        ),
        None => (optional_str(primary), None),
    };
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
