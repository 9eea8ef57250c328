use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use stockwise_core::ArticleId;
use stockwise_inventory::Article;

/// Read access to the article catalog (edited elsewhere).
pub trait CatalogRepository: Send + Sync {
    fn get_article(&self, article_id: ArticleId) -> Option<Article>;
    fn list_articles(&self) -> Vec<Article>;
}

impl<C> CatalogRepository for Arc<C>
where
    C: CatalogRepository + ?Sized,
{
    fn get_article(&self, article_id: ArticleId) -> Option<Article> {
        (**self).get_article(article_id)
    }

    fn list_articles(&self) -> Vec<Article> {
        (**self).list_articles()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    articles: RwLock<BTreeMap<ArticleId, Article>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, article: Article) {
        if let Ok(mut articles) = self.articles.write() {
            articles.insert(article.id, article);
        }
    }
}

impl CatalogRepository for InMemoryCatalog {
    fn get_article(&self, article_id: ArticleId) -> Option<Article> {
        self.articles.read().ok()?.get(&article_id).cloned()
    }

    fn list_articles(&self) -> Vec<Article> {
        match self.articles.read() {
            Ok(articles) => articles.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}
