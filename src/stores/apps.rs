// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Installed apps and the user's favorites

use std::sync::{Arc, OnceLock};

use crate::cache::{OptimisticStore, PollOutcome, ResourceCache, ResourceQuery};
use crate::client::ResourceClient;
use crate::config::CachePolicy;
use crate::error::ApiError;

use super::types::{App, parse_apps, parse_favorites};

pub const APPS_PATH: &str = "/api/v1/apps";
pub const FAVORITES_PATH: &str = "/api/v1/preferences/favorites";

pub struct AppsStore<C> {
    apps: ResourceCache<C, Vec<App>>,
    favorites_feed: ResourceCache<C, Vec<String>>,
    favorites: OptimisticStore<()>,
}

impl<C: ResourceClient> AppsStore<C> {
    pub fn new(client: Arc<C>, policy: CachePolicy) -> Self {
        Self {
            apps: ResourceCache::new("apps", Arc::clone(&client), parse_apps, policy),
            favorites_feed: ResourceCache::new("favorites", client, parse_favorites, policy),
            favorites: OptimisticStore::new(),
        }
    }

    fn apps_query() -> ResourceQuery {
        ResourceQuery::new(APPS_PATH)
    }

    fn favorites_query() -> ResourceQuery {
        ResourceQuery::new(FAVORITES_PATH)
    }

    pub async fn poll_apps(&self) -> PollOutcome<Vec<App>> {
        self.apps.poll(&Self::apps_query()).await
    }

    /// Polls the favorites list and reconciles the visible set with it.
    ///
    /// A listing that a toggle committed in the meantime may have outdated
    /// is reported as [`PollOutcome::Superseded`] and not applied.
    pub async fn poll_favorites(&self) -> PollOutcome<Vec<String>> {
        let commits = self.favorites.commits();
        match self.favorites_feed.poll(&Self::favorites_query()).await {
            PollOutcome::Updated(names) => {
                let applied = self
                    .favorites
                    .replace_all_since(commits, names.iter().map(|name| (name.clone(), ())));
                if applied {
                    PollOutcome::Updated(names)
                } else {
                    tracing::debug!("Favorites changed while polling, dropping listing");
                    PollOutcome::Superseded
                }
            }
            outcome => outcome,
        }
    }

    /// Reloads the app list on explicit request
    pub async fn refresh(&self) -> Result<Vec<App>, ApiError> {
        self.apps.fetch(&Self::apps_query(), true).await
    }

    pub async fn apps(&self) -> Vec<App> {
        self.apps
            .value(&Self::apps_query())
            .await
            .unwrap_or_default()
    }

    pub async fn app(&self, name: &str) -> Option<App> {
        self.apps().await.into_iter().find(|app| app.name == name)
    }

    pub async fn running_count(&self) -> usize {
        self.apps().await.iter().filter(|app| app.is_running()).count()
    }

    pub fn favorites(&self) -> Vec<String> {
        self.favorites.keys()
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.contains(name)
    }

    /// Apps the user marked as favorite, in list order
    pub async fn favorite_apps(&self) -> Vec<App> {
        self.apps()
            .await
            .into_iter()
            .filter(|app| self.favorites.contains(&app.name))
            .collect()
    }

    /// Flips the favorite flag of `name` optimistically.
    ///
    /// `Ok(false)` means a toggle of the same app is still in flight and this
    /// one was ignored. On failure the flag is restored and the error returned.
    pub async fn toggle_favorite(&self, name: &str) -> Result<bool, ApiError> {
        let adding = !self.favorites.contains(name);
        let path = format!("{FAVORITES_PATH}/{name}");
        let listing = OnceLock::new();

        let client = self.favorites_feed.client();
        let (path_ref, listing_ref) = (&path, &listing);
        let applied = self
            .favorites
            .mutate(
                name,
                |current| if current.is_some() { None } else { Some(()) },
                move || async move {
                    let response = if adding {
                        client.post(path_ref, None).await?
                    } else {
                        client.delete(path_ref, None).await?
                    };
                    if !response.is_null() {
                        if let Ok(names) = parse_favorites(response) {
                            let _ = listing_ref.set(names);
                        }
                    }
                    Ok(None)
                },
            )
            .await?;

        if applied {
            tracing::debug!(
                "Favorite {} {}",
                name,
                if adding { "added" } else { "removed" }
            );
            match listing.into_inner() {
                Some(names) => {
                    self.favorites
                        .replace_all(names.iter().map(|n| (n.clone(), ())));
                    self.favorites_feed
                        .store(&Self::favorites_query(), names)
                        .await;
                }
                None => self.favorites_feed.invalidate(&Self::favorites_query()).await,
            }
        }

        Ok(applied)
    }

    pub fn apps_cache(&self) -> &ResourceCache<C, Vec<App>> {
        &self.apps
    }

    pub fn favorites_cache(&self) -> &ResourceCache<C, Vec<String>> {
        &self.favorites_feed
    }
}
