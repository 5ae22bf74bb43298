//! URL construction for the chat API endpoints.
//!
//! Every endpoint is a path appended to the configured base URL. Path
//! segments and query values are percent-encoded by `url` itself.

use chatwire_core::ConversationFilters;
use url::Url;

use crate::error::{HttpError, HttpResult};

/// Endpoint builder rooted at the API base URL.
#[derive(Debug, Clone)]
pub struct ChatUrls {
    base: Url,
}

impl ChatUrls {
    /// Parse and validate the base URL.
    pub fn parse(base: &str) -> HttpResult<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(HttpError::InvalidBaseUrl(base.to_string()));
        }
        Ok(Self { base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `GET /conversations?page&per_page[&project_uuid][&search]`
    pub fn conversations(&self, page: u32, per_page: u32, filters: &ConversationFilters) -> Url {
        let mut url = self.endpoint(&["conversations"]);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("page", &page.to_string())
                .append_pair("per_page", &per_page.to_string());
            if let Some(project) = filters.project_uuid.as_deref() {
                query.append_pair("project_uuid", project);
            }
            if let Some(search) = filters.search.as_deref().map(str::trim) {
                if !search.is_empty() {
                    query.append_pair("search", search);
                }
            }
        }
        url
    }

    /// `POST /conversations`
    pub fn create_conversation(&self) -> Url {
        self.endpoint(&["conversations"])
    }

    /// `GET|DELETE /conversations/{uuid}`
    pub fn conversation(&self, uuid: &str) -> Url {
        self.endpoint(&["conversations", uuid])
    }

    pub fn archive(&self, uuid: &str) -> Url {
        self.endpoint(&["conversations", uuid, "archive"])
    }

    pub fn unarchive(&self, uuid: &str) -> Url {
        self.endpoint(&["conversations", uuid, "unarchive"])
    }

    /// `GET /conversations/{uuid}/messages?page&per_page`
    pub fn messages(&self, conversation_uuid: &str, page: u32, per_page: u32) -> Url {
        let mut url = self.endpoint(&["conversations", conversation_uuid, "messages"]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());
        url
    }

    /// `POST /chat`
    pub fn chat(&self) -> Url {
        self.endpoint(&["chat"])
    }

    /// `POST /chat/regenerate`
    pub fn regenerate(&self) -> Url {
        self.endpoint(&["chat", "regenerate"])
    }
}
