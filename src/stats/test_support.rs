//! In-memory fakes of the upstream services plus a ready-made stats stack on a temporary
//! database.

use super::{RankingService, SearchCountRecorder, StatsSynchronizer};
use crate::stats_store::{
    ArtistMonthlyStat, CommunityMonthlyStat, ContentMonthlyStat, StatsDatabase,
    StatsRepositories, StatsStore,
};
use crate::upstream::{
    ArtistDirectory, CommunityDirectory, ContentCatalog, UpstreamArtist, UpstreamComment,
    UpstreamCommunity, UpstreamContent, UpstreamEntityRef, UpstreamError, UpstreamGenre,
    UpstreamResult,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
pub struct FakeArtistDirectory {
    artists: Mutex<BTreeMap<i64, UpstreamResult<UpstreamArtist>>>,
    listing_fails: Mutex<bool>,
}

impl FakeArtistDirectory {
    pub fn put(&self, artist_id: i64, listeners: Option<f64>, rating: Option<f64>) {
        self.artists.lock().unwrap().insert(
            artist_id,
            Ok(UpstreamArtist {
                listeners,
                rating,
            }),
        );
    }

    /// Keeps the artist listed but makes fetching it fail.
    pub fn put_error(&self, artist_id: i64, error: UpstreamError) {
        self.artists.lock().unwrap().insert(artist_id, Err(error));
    }

    pub fn fail_listing(&self) {
        *self.listing_fails.lock().unwrap() = true;
    }
}

#[async_trait]
impl ArtistDirectory for FakeArtistDirectory {
    async fn fetch_artist(&self, artist_id: i64) -> UpstreamResult<UpstreamArtist> {
        self.artists
            .lock()
            .unwrap()
            .get(&artist_id)
            .cloned()
            .unwrap_or_else(|| Err(UpstreamError::NotFound(format!("artist {}", artist_id))))
    }

    async fn list_artists(&self) -> UpstreamResult<Vec<UpstreamEntityRef>> {
        if *self.listing_fails.lock().unwrap() {
            return Err(UpstreamError::Unavailable("listing down".to_string()));
        }
        Ok(self
            .artists
            .lock()
            .unwrap()
            .keys()
            .map(|id| UpstreamEntityRef { id: *id })
            .collect())
    }
}

#[derive(Default)]
pub struct FakeContentCatalog {
    contents: Mutex<BTreeMap<i64, UpstreamResult<UpstreamContent>>>,
    comments: Mutex<BTreeMap<i64, UpstreamResult<Vec<UpstreamComment>>>>,
}

impl FakeContentCatalog {
    pub fn put(&self, content_id: i64, sales: f64, rating: f64, genre: Option<&str>) {
        self.contents.lock().unwrap().insert(
            content_id,
            Ok(UpstreamContent {
                sales: Some(sales),
                rating: Some(rating),
                is_album: Some(false),
                is_new: Some(false),
                genre: genre.map(|name| UpstreamGenre {
                    name: Some(name.to_string()),
                }),
            }),
        );
    }

    pub fn put_error(&self, content_id: i64, error: UpstreamError) {
        self.contents.lock().unwrap().insert(content_id, Err(error));
    }

    pub fn put_comments(&self, content_id: i64, comments: UpstreamResult<Vec<UpstreamComment>>) {
        self.comments.lock().unwrap().insert(content_id, comments);
    }
}

#[async_trait]
impl ContentCatalog for FakeContentCatalog {
    async fn fetch_content(&self, content_id: i64) -> UpstreamResult<UpstreamContent> {
        self.contents
            .lock()
            .unwrap()
            .get(&content_id)
            .cloned()
            .unwrap_or_else(|| Err(UpstreamError::NotFound(format!("content {}", content_id))))
    }

    async fn list_contents(&self) -> UpstreamResult<Vec<UpstreamEntityRef>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .keys()
            .map(|id| UpstreamEntityRef { id: *id })
            .collect())
    }

    async fn fetch_comments(&self, content_id: i64) -> UpstreamResult<Vec<UpstreamComment>> {
        self.comments
            .lock()
            .unwrap()
            .get(&content_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
pub struct FakeCommunityDirectory {
    communities: Mutex<Vec<UpstreamCommunity>>,
}

impl FakeCommunityDirectory {
    pub fn put(&self, community_id: i64, posts: f64, members: f64) {
        let mut communities = self.communities.lock().unwrap();
        communities.retain(|c| c.id != community_id);
        communities.push(UpstreamCommunity {
            id: community_id,
            posts: Some(posts),
            members: Some(members),
        });
    }
}

#[async_trait]
impl CommunityDirectory for FakeCommunityDirectory {
    async fn list_communities(&self) -> UpstreamResult<Vec<UpstreamCommunity>> {
        Ok(self.communities.lock().unwrap().clone())
    }
}

pub struct TestStats {
    pub store: StatsStore,
    pub synchronizer: Arc<StatsSynchronizer>,
    pub rankings: RankingService,
    pub search_counts: Arc<SearchCountRecorder>,
    pub artists: Arc<FakeArtistDirectory>,
    pub contents: Arc<FakeContentCatalog>,
    pub communities: Arc<FakeCommunityDirectory>,
    _temp_dir: TempDir,
}

impl TestStats {
    pub fn new() -> Self {
        Self::with_repositories(StatsRepositories::sqlite())
    }

    pub fn with_repositories(repositories: StatsRepositories) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let database = StatsDatabase::open(temp_dir.path().join("stats.db")).unwrap();
        let store = StatsStore::new(database, repositories);
        let artists = Arc::new(FakeArtistDirectory::default());
        let contents = Arc::new(FakeContentCatalog::default());
        let communities = Arc::new(FakeCommunityDirectory::default());
        let synchronizer = Arc::new(StatsSynchronizer::new(
            store.clone(),
            artists.clone(),
            contents.clone(),
            communities.clone(),
        ));
        Self {
            rankings: RankingService::new(store.clone()),
            search_counts: Arc::new(SearchCountRecorder::new(store.clone())),
            store,
            synchronizer,
            artists,
            contents,
            communities,
            _temp_dir: temp_dir,
        }
    }

    pub fn stored_artist(&self, artist_id: i64) -> Option<ArtistMonthlyStat> {
        self.store
            .read(|uow, repos| repos.artists.get(uow, artist_id))
            .unwrap()
    }

    pub fn stored_content(&self, content_id: i64) -> Option<ContentMonthlyStat> {
        self.store
            .read(|uow, repos| repos.contents.get(uow, content_id))
            .unwrap()
    }

    pub fn stored_community(&self, community_id: i64) -> Option<CommunityMonthlyStat> {
        self.store
            .read(|uow, repos| repos.communities.get(uow, community_id))
            .unwrap()
    }
}
