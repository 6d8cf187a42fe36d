use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// Credentials accepted by `POST /login`.
pub const LOGIN: (&str, &str) = ("tiger", "secret");

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    Collection,
    File(Vec<u8>),
}

#[derive(Debug)]
pub struct Store {
    resources: HashMap<String, Resource>,
    locks: HashMap<String, String>,
}

impl Default for Store {
    fn default() -> Self {
        let mut resources = HashMap::new();
        resources.insert("/".to_string(), Resource::Collection);
        Self {
            resources,
            locks: HashMap::new(),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new().fallback(dispatch).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn dispatch(
    State(db): State<Db>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = normalize(uri.path());
    debug!(%method, %path, body = body.len(), "dav request");
    match method.as_str() {
        "GET" | "HEAD" => get(&db, &path).await,
        "PUT" => put(&db, &path, body).await,
        "DELETE" => delete(&db, &path).await,
        "MKCOL" => mkcol(&db, &path).await,
        "MOVE" => relocate(&db, &path, &headers, true).await,
        "COPY" => relocate(&db, &path, &headers, false).await,
        "PROPFIND" => propfind(&db, &path, &headers).await,
        "LOCK" => lock(&db, &path).await,
        "UNLOCK" => unlock(&db, &path, &headers).await,
        "OPTIONS" => options(),
        "POST" if path == "/login" => login(&body),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

/// Decode, drop any scheme and authority, and strip trailing slashes.
fn normalize(raw: &str) -> String {
    let raw = match raw.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => raw,
    };
    let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |d| d.into_owned());
    let trimmed = decoded.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

fn is_within(candidate: &str, root: &str) -> bool {
    if root == "/" {
        return true;
    }
    candidate == root
        || candidate
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn parent_is_collection(store: &Store, path: &str) -> bool {
    parent(path).is_some_and(|p| store.resources.get(p) == Some(&Resource::Collection))
}

async fn get(db: &Db, path: &str) -> Response {
    let store = db.read().await;
    match store.resources.get(path) {
        Some(Resource::File(data)) => (StatusCode::OK, data.clone()).into_response(),
        Some(Resource::Collection) => {
            let mut names: Vec<&str> = store
                .resources
                .keys()
                .filter(|k| parent(k) == Some(path))
                .map(String::as_str)
                .collect();
            names.sort_unstable();
            (StatusCode::OK, names.join("\n")).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put(db: &Db, path: &str, body: Bytes) -> Response {
    let mut store = db.write().await;
    if !parent_is_collection(&store, path) {
        return StatusCode::CONFLICT.into_response();
    }
    match store.resources.get(path) {
        Some(Resource::Collection) => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        existing => {
            let status = if existing.is_some() {
                StatusCode::NO_CONTENT
            } else {
                StatusCode::CREATED
            };
            store
                .resources
                .insert(path.to_string(), Resource::File(body.to_vec()));
            status.into_response()
        }
    }
}

async fn delete(db: &Db, path: &str) -> Response {
    let mut store = db.write().await;
    if path == "/" || !store.resources.contains_key(path) {
        return StatusCode::NOT_FOUND.into_response();
    }
    store.resources.retain(|k, _| !is_within(k, path));
    store.locks.retain(|k, _| !is_within(k, path));
    StatusCode::NO_CONTENT.into_response()
}

async fn mkcol(db: &Db, path: &str) -> Response {
    let mut store = db.write().await;
    if store.resources.contains_key(path) {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    if !parent_is_collection(&store, path) {
        return StatusCode::CONFLICT.into_response();
    }
    store
        .resources
        .insert(path.to_string(), Resource::Collection);
    StatusCode::CREATED.into_response()
}

async fn relocate(db: &Db, src: &str, headers: &HeaderMap, remove_source: bool) -> Response {
    let Some(dest) = headers
        .get("destination")
        .and_then(|v| v.to_str().ok())
        .map(normalize)
    else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let overwrite = headers
        .get("overwrite")
        .and_then(|v| v.to_str().ok())
        .map_or(true, |v| !v.eq_ignore_ascii_case("F"));

    let mut store = db.write().await;
    if !store.resources.contains_key(src) {
        return StatusCode::NOT_FOUND.into_response();
    }
    if dest == src || is_within(&dest, src) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let existed = store.resources.contains_key(&dest);
    if existed && !overwrite {
        return StatusCode::PRECONDITION_FAILED.into_response();
    }
    if !parent_is_collection(&store, &dest) {
        return StatusCode::CONFLICT.into_response();
    }

    store.resources.retain(|k, _| !is_within(k, &dest));
    let moved: Vec<(String, Resource)> = store
        .resources
        .iter()
        .filter(|(k, _)| is_within(k, src))
        .map(|(k, v)| (format!("{dest}{}", &k[src.len()..]), v.clone()))
        .collect();
    if remove_source {
        store.resources.retain(|k, _| !is_within(k, src));
        store.locks.retain(|k, _| !is_within(k, src));
    }
    store.resources.extend(moved);

    if existed {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::CREATED.into_response()
    }
}

fn depth_of(headers: &HeaderMap) -> Option<usize> {
    match headers.get("depth").and_then(|v| v.to_str().ok()) {
        Some("0") => Some(0),
        Some("1") => Some(1),
        _ => None,
    }
}

fn level(path: &str) -> usize {
    if path == "/" {
        0
    } else {
        path.matches('/').count()
    }
}

async fn propfind(db: &Db, path: &str, headers: &HeaderMap) -> Response {
    let store = db.read().await;
    if !store.resources.contains_key(path) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let max_level = depth_of(headers).map(|d| level(path) + d);

    let mut hrefs: Vec<(&String, &Resource)> = store
        .resources
        .iter()
        .filter(|(k, _)| is_within(k, path))
        .filter(|(k, _)| max_level.map_or(true, |max| level(k) <= max))
        .collect();
    hrefs.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<D:multistatus xmlns:D=\"DAV:\">\n");
    for (href, resource) in hrefs {
        let props = match resource {
            Resource::Collection => "<D:resourcetype><D:collection/></D:resourcetype>".to_string(),
            Resource::File(data) => format!(
                "<D:resourcetype/><D:getcontentlength>{}</D:getcontentlength>",
                data.len()
            ),
        };
        xml.push_str(&format!(
            "<D:response><D:href>{href}</D:href><D:propstat><D:prop>{props}</D:prop>\
             <D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>\n"
        ));
    }
    xml.push_str("</D:multistatus>\n");

    (
        StatusCode::MULTI_STATUS,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        xml,
    )
        .into_response()
}

async fn lock(db: &Db, path: &str) -> Response {
    let mut store = db.write().await;
    if store.locks.contains_key(path) {
        return StatusCode::LOCKED.into_response();
    }
    if !store.resources.contains_key(path) {
        if !parent_is_collection(&store, path) {
            return StatusCode::CONFLICT.into_response();
        }
        store
            .resources
            .insert(path.to_string(), Resource::File(Vec::new()));
    }
    let token = format!("opaquelocktoken:{}", Uuid::new_v4());
    store.locks.insert(path.to_string(), token.clone());

    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <D:prop xmlns:D=\"DAV:\"><D:lockdiscovery><D:activelock>\
         <D:locktoken><D:href>{token}</D:href></D:locktoken>\
         </D:activelock></D:lockdiscovery></D:prop>\n"
    );
    let mut response = (StatusCode::OK, xml).into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("<{token}>")) {
        response.headers_mut().insert("lock-token", value);
    }
    response
}

async fn unlock(db: &Db, path: &str, headers: &HeaderMap) -> Response {
    let token = headers
        .get("lock-token")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>'));
    let mut store = db.write().await;
    match (store.locks.get(path), token) {
        (Some(held), Some(given)) if held == given => {
            store.locks.remove(path);
            StatusCode::NO_CONTENT.into_response()
        }
        _ => StatusCode::CONFLICT.into_response(),
    }
}

fn options() -> Response {
    (
        StatusCode::OK,
        [
            ("dav", "1, 2"),
            (
                "allow",
                "OPTIONS, GET, HEAD, POST, PUT, DELETE, MKCOL, COPY, MOVE, PROPFIND, LOCK, UNLOCK",
            ),
        ],
    )
        .into_response()
}

fn form_value(body: &str, key: &str) -> Option<String> {
    body.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        let decode = |s: &str| {
            urlencoding::decode(&s.replace('+', " "))
                .map(|d| d.into_owned())
                .ok()
        };
        (decode(k)? == key).then(|| decode(v)).flatten()
    })
}

fn login(body: &[u8]) -> Response {
    let body = String::from_utf8_lossy(body);
    let user = form_value(&body, "login");
    let pass = form_value(&body, "password");
    if user.as_deref() != Some(LOGIN.0) || pass.as_deref() != Some(LOGIN.1) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let mut response = (StatusCode::OK, "welcome").into_response();
    let cookies = response.headers_mut();
    cookies.append(header::SET_COOKIE, HeaderValue::from_static("session=4f2a"));
    cookies.append(header::SET_COOKIE, HeaderValue::from_static("user=tiger"));
    response
}
