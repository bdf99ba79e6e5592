//! Request routing.

use http::Method;
use mist_core::model::{CONTACT_COLLECTION, NOTE_COLLECTION};

/// An owner-scoped collection exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// `/note`
    Note,
    /// `/contact`
    Contact,
}

impl Resource {
    /// Returns the collection holding the resource.
    pub fn collection(self) -> &'static str {
        match self {
            Resource::Note => NOTE_COLLECTION,
            Resource::Contact => CONTACT_COLLECTION,
        }
    }

    /// Returns the root element name used by exports.
    pub fn export_root(self) -> &'static str {
        match self {
            Resource::Note => "notes",
            Resource::Contact => "contacts",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            NOTE_COLLECTION => Some(Resource::Note),
            CONTACT_COLLECTION => Some(Resource::Contact),
            _ => None,
        }
    }
}

/// What to do on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `GET /{resource}`
    FindAll,
    /// `POST /{resource}`
    Insert,
    /// `POST /{resource}/import`
    Import,
    /// `GET /{resource}/export`
    Export,
    /// `GET /{resource}/{id}`
    Find(String),
    /// `PUT` or `PATCH /{resource}/{id}`: merges the given fields.
    Update(String),
    /// `DELETE /{resource}/{id}`
    Remove(String),
}

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `OPTIONS` on any path.
    Preflight,
    /// `POST /user/login`
    Login,
    /// `POST /user`
    Register,
    /// `GET /user`
    CurrentUser,
    /// `PUT` or `PATCH /user`
    UpdateUser,
    /// `DELETE /user`
    RemoveUser,
    /// Notes and contacts.
    Resource(Resource, Action),
}

impl Route {
    /// Resolves a method and path. Returns `None` when nothing matches.
    pub fn resolve(method: &Method, path: &str) -> Option<Self> {
        if *method == Method::OPTIONS {
            return Some(Route::Preflight);
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match (segments.as_slice(), method.as_str()) {
            (["user"], "POST") => Some(Route::Register),
            (["user"], "GET") => Some(Route::CurrentUser),
            (["user"], "PUT" | "PATCH") => Some(Route::UpdateUser),
            (["user"], "DELETE") => Some(Route::RemoveUser),
            (["user", "login"], "POST") => Some(Route::Login),
            ([resource], method) => {
                let action = match method {
                    "GET" => Action::FindAll,
                    "POST" => Action::Insert,
                    _ => return None,
                };
                Some(Route::Resource(Resource::from_segment(resource)?, action))
            }
            ([resource, "import"], "POST") => {
                Some(Route::Resource(Resource::from_segment(resource)?, Action::Import))
            }
            ([resource, "export"], "GET") => {
                Some(Route::Resource(Resource::from_segment(resource)?, Action::Export))
            }
            ([resource, id], method) => {
                let id = (*id).to_string();
                let action = match method {
                    "GET" => Action::Find(id),
                    "PUT" | "PATCH" => Action::Update(id),
                    "DELETE" => Action::Remove(id),
                    _ => return None,
                };
                Some(Route::Resource(Resource::from_segment(resource)?, action))
            }
            _ => None,
        }
    }
}
