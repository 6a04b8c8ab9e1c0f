pub mod article_source;
pub mod graph_sink;
pub mod mwe_extractor;

pub use article_source::{ArticleSourceClient, ArticleSourceConfig, SourceArticle};
pub use graph_sink::{GraphSinkClient, GraphSinkConfig};
pub use mwe_extractor::{ExtractInput, MweExtractorClient, MweExtractorConfig};
