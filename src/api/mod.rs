//! HTTP surface of the file storage service
//!
//! Collection-oriented routes under `/api/files/` plus the root sitemap and
//! the obfuscated admin surface. Every JSON response is the uniform
//! hypermedia envelope; the authorization gate runs before anything else in
//! every handler so denials never leak resource existence.

use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, info, warn};

use crate::app_state::AppState;
use crate::auth::Resource;
use crate::envelope::{Envelope, Link};
use crate::fileid::{self, IdStrategy};
use crate::store::{FileRecord, StoreError};
use crate::validate::{parse_upload_metadata, ValidationError};

const INSUFFICIENT_PERMISSIONS: &str = "Token has insufficient permissions.";
const TEAPOT_EMOJI: &str = "\u{1FAD6}";

/// Register every route of the service. Shared by the binary and the test
/// harness so both always serve the same table.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(sitemap))
        .route("/", web::post().to(admin))
        .route("/api/files/", web::get().to(list_namespaces))
        .route("/api/files/", web::post().to(reject_namespace_create))
        .route("/api/files/{namespace}/", web::get().to(list_files))
        .route("/api/files/{namespace}/", web::post().to(upload_file))
        .route("/api/files/{namespace}/{fileid}/", web::get().to(download_file))
        .route("/api/files/{namespace}/{fileid}/", web::post().to(reject_file_update));
}

/// Pseudonymous end-user token, forwarded verbatim to the oracle. An absent
/// header becomes an empty token; the oracle owns the verdict either way.
fn auth_token(req: &HttpRequest) -> String {
    req.headers()
        .get("authprovidertoken")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn envelope_response(
    status: StatusCode,
    path: &str,
    data: Vec<String>,
    error: impl Into<String>,
) -> HttpResponse {
    HttpResponse::build(status).json(Envelope::new(path, data, error))
}

fn denied(path: &str) -> HttpResponse {
    envelope_response(
        StatusCode::UNAUTHORIZED,
        path,
        vec![],
        INSUFFICIENT_PERMISSIONS,
    )
}

fn unknown_namespace(path: &str, namespace: &str) -> HttpResponse {
    envelope_response(
        StatusCode::NOT_FOUND,
        path,
        vec![],
        StoreError::UnknownNamespace(namespace.to_string()).to_string(),
    )
}

/// GET /api/files/ — list configured namespaces with one link each.
pub async fn list_namespaces(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let path = req.path().to_string();
    if !state.gate().authorize(Resource::Collection, &path, "GET", &auth_token(&req)) {
        return denied(&path);
    }

    let names: Vec<String> = state.config.namespaces.keys().cloned().collect();
    let mut envelope = Envelope::new(&path, names.clone(), "");
    for name in &names {
        envelope.add_link(name, Link::new(format!("/api/files/{}/", name)));
    }
    HttpResponse::Ok().json(envelope)
}

/// POST /api/files/ — always rejected; namespaces are fixed at startup.
pub async fn reject_namespace_create(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let path = req.path().to_string();
    if !state.gate().authorize(Resource::Collection, &path, "POST", &auth_token(&req)) {
        return denied(&path);
    }
    envelope_response(
        StatusCode::FORBIDDEN,
        &path,
        vec![],
        "Creating new databases is not allowed through this API.",
    )
}

/// GET /api/files/{namespace}/ — list stored identifiers, each with a link
/// carrying the stored filename.
pub async fn list_files(
    req: HttpRequest,
    namespace: web::Path<String>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let path = req.path().to_string();
    let namespace = namespace.into_inner();
    log_mdc::insert("namespace", namespace.as_str());

    if !state.gate().authorize(Resource::Collection, &path, "GET", &auth_token(&req)) {
        return denied(&path);
    }
    if !state.config.namespaces.contains_key(&namespace) {
        return unknown_namespace(&path, &namespace);
    }

    let fileids = match state.store.list(&namespace) {
        Ok(fileids) => fileids,
        Err(e) => {
            warn!("Listing {} failed: {}", namespace, e);
            return envelope_response(StatusCode::INTERNAL_SERVER_ERROR, &path, vec![], e.to_string());
        }
    };

    let mut envelope = Envelope::new(&path, fileids.clone(), "");
    for fileid in &fileids {
        if let Ok(record) = state.store.get(&namespace, fileid) {
            envelope.add_link(
                fileid,
                Link::named(
                    format!("/api/files/{}/{}", namespace, fileid),
                    record.file_name,
                ),
            );
        }
    }
    HttpResponse::Ok().json(envelope)
}

/// POST /api/files/{namespace}/ — upload. Raw binary body, `metadata` header
/// with `{filename, idtype, customid?}`.
pub async fn upload_file(
    req: HttpRequest,
    namespace: web::Path<String>,
    mut payload: web::Payload,
    state: web::Data<AppState>,
) -> HttpResponse {
    let path = req.path().to_string();
    let namespace = namespace.into_inner();
    log_mdc::insert("namespace", namespace.as_str());
    let token = auth_token(&req);

    // The gate runs before any validation, even the namespace lookup.
    if !state.gate().authorize(Resource::Collection, &path, "POST", &token) {
        return denied(&path);
    }

    // Capture timestamp and identity before detailed handling so the stored
    // record reflects when the attempt started.
    let timestamp = fileid::now_nanos();
    let personal_info = state.auth.personal_info(&token);

    if !state.config.namespaces.contains_key(&namespace) {
        return unknown_namespace(&path, &namespace);
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        match chunk {
            Ok(chunk) => body.extend_from_slice(&chunk),
            Err(e) => {
                warn!("Upload stream failed for {}: {}", namespace, e);
                return envelope_response(
                    StatusCode::BAD_REQUEST,
                    &path,
                    vec![],
                    "Failed to read upload stream.",
                );
            }
        }
    }

    let metadata_str = match req.headers().get("metadata") {
        Some(value) => match value.to_str() {
            Ok(s) => Some(s),
            Err(_) => {
                return envelope_response(
                    StatusCode::BAD_REQUEST,
                    &path,
                    vec![],
                    ValidationError::MalformedMetadataJson.to_string(),
                )
            }
        },
        None => None,
    };
    let metadata = match parse_upload_metadata(metadata_str) {
        Ok(metadata) => metadata,
        Err(e) => return envelope_response(StatusCode::BAD_REQUEST, &path, vec![], e.to_string()),
    };

    let strategy = match metadata.idtype.parse::<IdStrategy>() {
        Ok(strategy) => strategy,
        Err(e) => return envelope_response(StatusCode::BAD_REQUEST, &path, vec![], e.to_string()),
    };
    let fileid = match fileid::generate(strategy, metadata.customid.as_deref()) {
        Ok(fileid) => fileid,
        Err(e) => return envelope_response(StatusCode::BAD_REQUEST, &path, vec![], e.to_string()),
    };

    let record = FileRecord {
        id_type: strategy,
        file_name: metadata.filename,
        timestamp,
        payload: body.to_vec(),
        permission_partial: state.auth.record_partial(&namespace, &fileid),
        personal_info,
    };

    match state.store.create(&namespace, &fileid, record) {
        Ok(()) => {
            info!("Uploaded {} to namespace {}", fileid, namespace);
            envelope_response(StatusCode::CREATED, &path, vec![fileid], "")
        }
        Err(e @ StoreError::Collision(_)) => {
            debug!("Upload collision in {}: {}", namespace, fileid);
            envelope_response(StatusCode::FORBIDDEN, &path, vec![fileid], e.to_string())
        }
        Err(e @ StoreError::UnknownNamespace(_)) => {
            envelope_response(StatusCode::NOT_FOUND, &path, vec![], e.to_string())
        }
        Err(e) => {
            warn!("Upload to {} failed: {}", namespace, e);
            envelope_response(StatusCode::INTERNAL_SERVER_ERROR, &path, vec![], e.to_string())
        }
    }
}

/// GET /api/files/{namespace}/{fileid}/ — binary download with the stored
/// filename in a content-disposition attachment header.
pub async fn download_file(
    req: HttpRequest,
    params: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let path = req.path().to_string();
    let (namespace, fileid) = params.into_inner();
    log_mdc::insert("namespace", namespace.as_str());

    let resource = Resource::File {
        namespace: &namespace,
        fileid: &fileid,
    };
    if !state.gate().authorize(resource, &path, "GET", &auth_token(&req)) {
        return denied(&path);
    }
    if !state.config.namespaces.contains_key(&namespace) {
        return unknown_namespace(&path, &namespace);
    }

    match state.store.get(&namespace, &fileid) {
        Ok(record) => HttpResponse::Ok()
            .content_type("application/octet-stream")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename={}", record.file_name),
            ))
            .body(record.payload),
        Err(e @ StoreError::UnknownId(_)) => {
            envelope_response(StatusCode::NOT_FOUND, &path, vec![], e.to_string())
        }
        Err(e) => {
            warn!("Download {}/{} failed: {}", namespace, fileid, e);
            envelope_response(StatusCode::INTERNAL_SERVER_ERROR, &path, vec![], e.to_string())
        }
    }
}

/// POST /api/files/{namespace}/{fileid}/ — always rejected; stored records
/// are immutable through this surface.
pub async fn reject_file_update(
    req: HttpRequest,
    params: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let path = req.path().to_string();
    let (namespace, fileid) = params.into_inner();

    let resource = Resource::File {
        namespace: &namespace,
        fileid: &fileid,
    };
    if !state.gate().authorize(resource, &path, "POST", &auth_token(&req)) {
        return denied(&path);
    }
    envelope_response(
        StatusCode::FORBIDDEN,
        &path,
        vec![],
        "Modifying this file is not allowed through this API.",
    )
}

/// GET / — plain-text tl;dr documentation and condensed sitemap.
pub async fn sitemap(state: web::Data<AppState>) -> HttpResponse {
    let routes = [
        "/",
        "/api/files/",
        "/api/files/<namespace>/",
        "/api/files/<namespace>/<fileid>/",
    ];
    let mut info = String::new();
    info.push_str("--------------------------[ tl;dr documentation ]--------------------------\n");
    info.push_str("About api endpoints (HATEOAS):\n");
    info.push_str("  * All /api/files/ endpoints respond to GET/POST with hypermedia controls.\n");
    info.push_str("  * Only /api/files/<namespace>/<fileid>/ will send file on GET request.\n");
    info.push_str("  * Only /api/files/<namespace>/ will not return error on POST request.\n\n");
    info.push_str("About other pages:\n");
    info.push_str("  * Root responds with this readme on GET. Use POST to use admin tools.\n\n");
    info.push_str("Metadata formats (sent as json in the 'metadata' http header):\n");
    info.push_str("  * {\"filename\": \"asd.py\", \"idtype\": \"snowflake\"}\n");
    info.push_str("  * {\"filename\": \"asd.py\", \"idtype\": \"custom\", \"customid\": \"myname\"}\n\n");
    info.push_str("Authorization:\n");
    info.push_str("  * Each request carries a pseudonymous token in the 'authprovidertoken'\n");
    info.push_str("    http header. Every (method, URL) pair maps to a permission object;\n");
    info.push_str("    the authprovider service combines object and token into allow/deny.\n\n");
    info.push_str("---------------------------[ condensed sitemap ]---------------------------\n");
    info.push_str("Active routes:\n");
    for route in routes {
        info.push_str(&format!("  * {}\n", route));
    }
    info.push_str("Active namespaces:\n");
    for name in state.config.namespaces.keys() {
        info.push_str(&format!("  * /api/files/{}/\n", name));
    }
    HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(info)
}

fn teapot(status_prefix: &str) -> HttpResponse {
    HttpResponse::ImATeapot()
        .content_type("text/plain; charset=utf-8")
        .body(format!("{} I'm a teapot {}", status_prefix, TEAPOT_EMOJI))
}

/// POST / — admin surface. Supports exactly one method,
/// `clear_personal_information(namespace, fileid)`.
///
/// All outcomes travel as 418 with only the embedded status string telling
/// them apart. The mismatch is deliberate obscurity on an endpoint whose
/// existence is not advertised, not an oversight.
pub async fn admin(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let path = req.path().to_string();
    if !state.gate().authorize(Resource::CollectionRoot, &path, "POST", &auth_token(&req)) {
        return teapot("418");
    }

    let parsed = req
        .headers()
        .get("metadata")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok());
    let metadata = match parsed {
        Some(metadata) => metadata,
        None => return teapot("418"),
    };
    let (method, args) = match (metadata.get("method"), metadata.get("args")) {
        (Some(serde_json::Value::String(method)), Some(serde_json::Value::Array(args))) => {
            (method.clone(), args.clone())
        }
        _ => return teapot("418"),
    };

    if method != "clear_personal_information" {
        return teapot("418");
    }

    let (namespace, fileid) = match (args.first().and_then(|v| v.as_str()), args.get(1).and_then(|v| v.as_str())) {
        (Some(namespace), Some(fileid)) if args.len() == 2 => (namespace, fileid),
        _ => return teapot("500"),
    };

    match state.store.clear_personal_info(namespace, fileid) {
        Ok(()) => {
            info!("Cleared personal information for {}/{}", namespace, fileid);
            teapot("200")
        }
        Err(e) => {
            warn!("Admin redaction failed for {}/{}: {}", namespace, fileid, e);
            teapot("500")
        }
    }
}
