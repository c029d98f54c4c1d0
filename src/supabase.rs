//! [`Backend`] implementation over the Supabase REST surface.
//!
//! Tables are reached through PostgREST at `{url}/rest/v1/{table}`, the
//! folder subtree query through the `cards_in_tree` remote procedure. Every
//! request carries the project's anon key twice, as the `apikey` header and
//! as a bearer token.
//!
//! # Query Syntax
//!
//! | Need | Parameter |
//! |------|-----------|
//! | equality | `id=eq.<uuid>` |
//! | null parent | `parent_id=is.null` |
//! | pattern | `name=ilike.*rust*` |
//! | any-of | `or=(title.ilike.*q*,description.ilike.*q*,tags.cs.{q})` |
//! | ordering | `order=parent_id.asc.nullsfirst,order_index.asc` |
//! | full-table delete | `id=neq.00000000-0000-0000-0000-000000000000` |
//!
//! Inserts and updates ask for `Prefer: return=representation` so the stored
//! row comes back. Reorders are bulk upserts of `{id, order_index}` with
//! `Prefer: resolution=merge-duplicates`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use linkboard_core::models::{
    Card, CardFolder, CardPatch, Folder, FolderPatch, FolderRef, NewCard, NewFolder, NewSection,
    OrderUpdate, Section, SectionPatch,
};
use linkboard_core::store::{Backend, Snapshot};
use linkboard_core::DashboardError;

use crate::config::BackendConfig;

const RETURN_ROW: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates";

/// Matches every row; PostgREST refuses unfiltered deletes.
const ALL_ROWS: &str = "neq.00000000-0000-0000-0000-000000000000";

/// Authenticated HTTP client for one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        if !config.is_configured() {
            anyhow::bail!("backend.url is not configured");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            anon_key: config.anon_key().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A request with the project's auth headers attached.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!(%method, url, "supabase request");
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    /// Sends `req` and turns a non-success status into
    /// [`DashboardError::Backend`].
    pub async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("{}: request failed", what))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body);
        tracing::warn!(status = status.as_u16(), what, %message, "supabase request rejected");
        Err(anyhow::Error::new(DashboardError::Backend {
            status: status.as_u16(),
            message,
        })
        .context(what.to_string()))
    }
}

/// PostgREST and storage errors carry a JSON `message`; anything else is
/// passed through as text.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(m), ..
        }) => m,
        Ok(ErrorBody { error: Some(e), .. }) => e,
        _ => body.trim().to_string(),
    }
}

/// Quotes a value for use inside an `or=(...)` list when it contains
/// characters PostgREST treats as syntax.
pub fn quote_filter_value(value: &str) -> String {
    let reserved = |c: char| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\' | '{' | '}') || c.is_whitespace();
    if !value.chars().any(reserved) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// The `or` filter matching title, description or an exact tag.
pub fn card_search_filter(query: &str) -> String {
    let pattern = quote_filter_value(&format!("*{}*", query));
    let tag = quote_filter_value(query);
    format!(
        "(title.ilike.{p},description.ilike.{p},tags.cs.{{{t}}})",
        p = pattern,
        t = tag
    )
}

fn eq(id: Uuid) -> String {
    format!("eq.{}", id)
}

/// Supabase-hosted [`Backend`].
pub struct SupabaseBackend {
    client: SupabaseClient,
}

impl SupabaseBackend {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Ok(Self::new(SupabaseClient::new(config)?))
    }

    fn table(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.client.base_url(), table)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let req = self.client.request(Method::GET, &self.table(table)).query(query);
        let resp = self.client.send(req, &format!("select {}", table)).await?;
        resp.json()
            .await
            .with_context(|| format!("select {}: unexpected response shape", table))
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, id: Uuid) -> Result<Option<T>> {
        let rows: Vec<T> = self
            .select(table, &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<T> {
        let req = self
            .client
            .request(Method::POST, &self.table(table))
            .header("Prefer", RETURN_ROW)
            .json(body);
        let resp = self.client.send(req, &format!("insert {}", table)).await?;
        let rows: Vec<T> = resp
            .json()
            .await
            .with_context(|| format!("insert {}: unexpected response shape", table))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("insert {}: no row returned", table))
    }

    async fn insert_many<B: Serialize>(&self, table: &str, rows: &[B]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let req = self
            .client
            .request(Method::POST, &self.table(table))
            .json(rows);
        self.client.send(req, &format!("insert {}", table)).await?;
        Ok(())
    }

    async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        kind: &'static str,
        id: Uuid,
        patch: &B,
    ) -> Result<T> {
        let req = self
            .client
            .request(Method::PATCH, &self.table(table))
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_ROW)
            .json(patch);
        let resp = self.client.send(req, &format!("update {}", table)).await?;
        let rows: Vec<T> = resp
            .json()
            .await
            .with_context(|| format!("update {}: unexpected response shape", table))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DashboardError::not_found(kind, id).into())
    }

    async fn delete(&self, table: &str, query: &[(&str, String)]) -> Result<()> {
        let req = self
            .client
            .request(Method::DELETE, &self.table(table))
            .query(query);
        self.client.send(req, &format!("delete {}", table)).await?;
        Ok(())
    }

    async fn upsert_order(&self, table: &str, updates: &[OrderUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let req = self
            .client
            .request(Method::POST, &self.table(table))
            .header("Prefer", MERGE_DUPLICATES)
            .json(updates);
        self.client.send(req, &format!("reorder {}", table)).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct FolderLinkRow {
    folders: Option<FolderRef>,
}

#[async_trait]
impl Backend for SupabaseBackend {
    // ---- sections ----

    async fn list_sections(&self) -> Result<Vec<Section>> {
        self.select(
            "sections",
            &[
                ("select", "*".to_string()),
                ("order", "order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn get_section(&self, id: Uuid) -> Result<Option<Section>> {
        self.select_one("sections", id).await
    }

    async fn create_section(&self, new: &NewSection) -> Result<Section> {
        self.insert("sections", new).await
    }

    async fn update_section(&self, id: Uuid, patch: &SectionPatch) -> Result<Section> {
        self.update("sections", "section", id, patch).await
    }

    async fn delete_section(&self, id: Uuid) -> Result<()> {
        self.delete("sections", &[("id", eq(id))]).await
    }

    async fn reorder_sections(&self, updates: &[OrderUpdate]) -> Result<()> {
        self.upsert_order("sections", updates).await
    }

    // ---- folders ----

    async fn list_folders(&self, section_id: Uuid) -> Result<Vec<Folder>> {
        self.select(
            "folders",
            &[
                ("select", "*".to_string()),
                ("section_id", eq(section_id)),
                ("order", "parent_id.asc.nullsfirst,order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn get_folder(&self, id: Uuid) -> Result<Option<Folder>> {
        self.select_one("folders", id).await
    }

    async fn folder_children(
        &self,
        section_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Vec<Folder>> {
        let parent = match parent_id {
            Some(id) => eq(id),
            None => "is.null".to_string(),
        };
        self.select(
            "folders",
            &[
                ("select", "*".to_string()),
                ("section_id", eq(section_id)),
                ("parent_id", parent),
                ("order", "order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn create_folder(&self, new: &NewFolder) -> Result<Folder> {
        self.insert("folders", new).await
    }

    async fn update_folder(&self, id: Uuid, patch: &FolderPatch) -> Result<Folder> {
        self.update("folders", "folder", id, patch).await
    }

    async fn delete_folder(&self, id: Uuid) -> Result<()> {
        self.delete("folders", &[("id", eq(id))]).await
    }

    async fn reorder_folders(&self, updates: &[OrderUpdate]) -> Result<()> {
        self.upsert_order("folders", updates).await
    }

    // ---- cards ----

    async fn list_cards(&self, section_id: Uuid) -> Result<Vec<Card>> {
        self.select(
            "cards",
            &[
                ("select", "*".to_string()),
                ("section_id", eq(section_id)),
                ("order", "order_index.asc,created_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn cards_without_folder(&self, section_id: Uuid) -> Result<Vec<Card>> {
        self.select(
            "cards_without_folder",
            &[
                ("select", "*".to_string()),
                ("section_id", eq(section_id)),
                ("order", "order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn cards_in_tree(&self, root: Uuid) -> Result<Vec<Card>> {
        let url = format!("{}/rest/v1/rpc/cards_in_tree", self.client.base_url());
        let req = self
            .client
            .request(Method::POST, &url)
            .json(&serde_json::json!({ "root": root }));
        let resp = self.client.send(req, "rpc cards_in_tree").await?;
        resp.json()
            .await
            .context("rpc cards_in_tree: unexpected response shape")
    }

    async fn get_card(&self, id: Uuid) -> Result<Option<Card>> {
        self.select_one("cards", id).await
    }

    async fn create_card(&self, new: &NewCard) -> Result<Card> {
        self.insert("cards", new).await
    }

    async fn update_card(&self, id: Uuid, patch: &CardPatch) -> Result<Card> {
        self.update("cards", "card", id, patch).await
    }

    async fn delete_card(&self, id: Uuid) -> Result<()> {
        self.delete("cards", &[("id", eq(id))]).await
    }

    async fn reorder_cards(&self, updates: &[OrderUpdate]) -> Result<()> {
        self.upsert_order("cards", updates).await
    }

    // ---- card/folder links ----

    async fn card_folders(&self, card_id: Uuid) -> Result<Vec<FolderRef>> {
        let rows: Vec<FolderLinkRow> = self
            .select(
                "card_folders",
                &[
                    ("select", "folder_id,folders(id,name,section_id)".to_string()),
                    ("card_id", eq(card_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().filter_map(|r| r.folders).collect())
    }

    async fn link_card(&self, card_id: Uuid, folder_id: Uuid) -> Result<()> {
        self.insert_many("card_folders", &[CardFolder { card_id, folder_id }])
            .await
    }

    async fn unlink_card(&self, card_id: Uuid, folder_id: Uuid) -> Result<()> {
        self.delete(
            "card_folders",
            &[("card_id", eq(card_id)), ("folder_id", eq(folder_id))],
        )
        .await
    }

    async fn set_card_folders(&self, card_id: Uuid, folder_ids: &[Uuid]) -> Result<()> {
        self.delete("card_folders", &[("card_id", eq(card_id))])
            .await?;
        let rows: Vec<CardFolder> = folder_ids
            .iter()
            .map(|folder_id| CardFolder {
                card_id,
                folder_id: *folder_id,
            })
            .collect();
        self.insert_many("card_folders", &rows).await
    }

    // ---- search ----

    async fn search_sections(&self, query: &str) -> Result<Vec<Section>> {
        self.select(
            "sections",
            &[
                ("select", "*".to_string()),
                ("name", format!("ilike.*{}*", query)),
                ("order", "order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn search_folders(&self, query: &str) -> Result<Vec<Folder>> {
        self.select(
            "folders",
            &[
                ("select", "*".to_string()),
                ("name", format!("ilike.*{}*", query)),
                ("order", "order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn search_cards(&self, query: &str, section_id: Option<Uuid>) -> Result<Vec<Card>> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("or", card_search_filter(query)),
        ];
        if let Some(section_id) = section_id {
            params.push(("section_id", eq(section_id)));
        }
        params.push((
            "order",
            "is_favorite.desc,order_index.asc,created_at.desc".to_string(),
        ));
        self.select("cards", &params).await
    }

    // ---- transfer ----

    async fn dump(&self) -> Result<Snapshot> {
        let all = || ("select", "*".to_string());
        Ok(Snapshot {
            sections: self
                .select("sections", &[all(), ("order", "order_index.asc".to_string())])
                .await?,
            folders: self
                .select("folders", &[all(), ("order", "created_at.asc".to_string())])
                .await?,
            cards: self
                .select("cards", &[all(), ("order", "created_at.asc".to_string())])
                .await?,
            card_folders: self.select("card_folders", &[all()]).await?,
        })
    }

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<()> {
        self.delete("card_folders", &[("card_id", ALL_ROWS.to_string())])
            .await
            .context("import step 'clear card_folders' failed")?;
        self.delete("cards", &[("id", ALL_ROWS.to_string())])
            .await
            .context("import step 'clear cards' failed")?;
        self.delete("folders", &[("id", ALL_ROWS.to_string())])
            .await
            .context("import step 'clear folders' failed")?;
        self.delete("sections", &[("id", ALL_ROWS.to_string())])
            .await
            .context("import step 'clear sections' failed")?;

        self.insert_many("sections", &snapshot.sections)
            .await
            .context("import step 'insert sections' failed")?;
        self.insert_many("folders", &snapshot.folders)
            .await
            .context("import step 'insert folders' failed")?;
        self.insert_many("cards", &snapshot.cards)
            .await
            .context("import step 'insert cards' failed")?;
        self.insert_many("card_folders", &snapshot.card_folders)
            .await
            .context("import step 'insert card_folders' failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_values_are_not_quoted() {
        assert_eq!(quote_filter_value("rust"), "rust");
        assert_eq!(quote_filter_value("*rust*"), "*rust*");
    }

    #[test]
    fn test_reserved_values_are_quoted() {
        assert_eq!(quote_filter_value("a,b"), "\"a,b\"");
        assert_eq!(quote_filter_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_filter_value("docs.rs"), "\"docs.rs\"");
    }

    #[test]
    fn test_card_search_filter() {
        assert_eq!(
            card_search_filter("rust"),
            "(title.ilike.*rust*,description.ilike.*rust*,tags.cs.{rust})"
        );
        assert_eq!(
            card_search_filter("a b"),
            "(title.ilike.\"*a b*\",description.ilike.\"*a b*\",tags.cs.{\"a b\"})"
        );
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key"}"#),
            "duplicate key"
        );
        assert_eq!(error_message(r#"{"error":"Bucket not found"}"#), "Bucket not found");
        assert_eq!(error_message(" gateway timeout \n"), "gateway timeout");
    }

    #[test]
    fn test_client_requires_url() {
        let cfg = BackendConfig {
            url: String::new(),
            anon_key: None,
            timeout_secs: 30,
        };
        assert!(SupabaseClient::new(&cfg).is_err());
    }
}
