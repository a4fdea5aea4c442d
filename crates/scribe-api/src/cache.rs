use scribe_db::models::PostRow;
use tokio::sync::RwLock;

/// Full post listing, kept until the next write.
///
/// Every `invalidate` bumps a generation counter. A listing read from the
/// database is only stored if no write invalidated the cache while it was
/// being read.
pub struct PostCache {
    inner: RwLock<Inner>,
}

struct Inner {
    generation: u64,
    all_posts: Option<Vec<PostRow>>,
}

impl PostCache {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                generation: 0,
                all_posts: None,
            }),
        }
    }

    pub async fn all_posts(&self) -> Option<Vec<PostRow>> {
        self.inner.read().await.all_posts.clone()
    }

    /// Take this before reading the listing and hand it back to `refresh`.
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// Store a listing read at `generation`. Returns false, leaving the
    /// cache cold, when a write happened since.
    pub async fn refresh(&self, generation: u64, posts: Vec<PostRow>) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            return false;
        }
        inner.all_posts = Some(posts);
        true
    }

    pub async fn invalidate(&self) {
        let mut inner = self.inner.write().await;
        inner.generation = inner.generation.wrapping_add(1);
        inner.all_posts = None;
    }
}

impl Default for PostCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: i64) -> PostRow {
        PostRow {
            id,
            author_id: "u1".into(),
            title: format!("Post {id}"),
            content: "Body".into(),
            created_at: "2024-01-01 00:00:00".into(),
        }
    }

    #[tokio::test]
    async fn starts_cold() {
        assert!(PostCache::new().all_posts().await.is_none());
    }

    #[tokio::test]
    async fn refresh_then_invalidate() {
        let cache = PostCache::new();
        let generation = cache.generation().await;
        assert!(cache.refresh(generation, vec![post(2), post(1)]).await);
        let cached = cache.all_posts().await.unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].id, 2);

        cache.invalidate().await;
        assert!(cache.all_posts().await.is_none());
    }

    #[tokio::test]
    async fn empty_listing_is_still_cached() {
        let cache = PostCache::new();
        let generation = cache.generation().await;
        cache.refresh(generation, vec![]).await;
        assert_eq!(cache.all_posts().await, Some(vec![]));
    }

    #[tokio::test]
    async fn listing_read_before_a_write_is_discarded() {
        let cache = PostCache::new();
        let generation = cache.generation().await;

        // A write lands between reading the listing and storing it.
        cache.invalidate().await;
        assert!(!cache.refresh(generation, vec![post(1)]).await);
        assert!(cache.all_posts().await.is_none());

        let generation = cache.generation().await;
        assert!(cache.refresh(generation, vec![post(2), post(1)]).await);
        assert_eq!(cache.all_posts().await.unwrap().len(), 2);
    }
}
