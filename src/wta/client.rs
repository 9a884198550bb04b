use crate::{
    config::Settings,
    error::{RankingError, RankingResult},
    wta::ranking::{parse_ranking, ScrapedRanking},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Anything able to produce a fresh ranking.
#[async_trait]
pub trait RankingSource: Send + Sync {
    async fn ranking(&self) -> RankingResult<ScrapedRanking>;
}

pub struct LiveRanking {
    http_client: Client,
    url: String,
}

impl LiveRanking {
    pub fn new(settings: &Settings) -> RankingResult<Self> {
        let http_client = Client::builder().timeout(settings.http_timeout()).build()?;
        Ok(Self {
            http_client,
            url: settings.ranking_url.clone(),
        })
    }

    pub async fn document(&self) -> RankingResult<String> {
        debug!(url = %self.url, "Fetching live ranking page.");
        let response = self.http_client.get(&self.url).send().await?;

        match response.status() {
            StatusCode::OK => response
                .text()
                .await
                .map_err(|e| RankingError::Http(format!("Could not read ranking page. {e}"))),
            status => Err(RankingError::Http(format!("{} from {}", status, self.url))),
        }
    }
}

#[async_trait]
impl RankingSource for LiveRanking {
    async fn ranking(&self) -> RankingResult<ScrapedRanking> {
        let document = self.document().await?;
        // Html is not Send, keep parsing out of any await point.
        let players = parse_ranking(&document)?;
        debug!(players = players.len(), "Parsed live ranking page.");
        Ok(ScrapedRanking::new(players))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wta::ranking::fixtures::{page, ranking_page, row};
    use figment::{
        providers::{Format, Serialized, Yaml},
        Figment,
    };
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RANKING_PATH: &str = "/en/wta-live-ranking";

    fn client_for(server: &MockServer) -> LiveRanking {
        let settings = Settings::from_figment(
            Figment::new()
                .merge(Yaml::string("cache_timeout_minutes: 10\nhttp_timeout_sec: 2"))
                .merge(Serialized::default(
                    "ranking_url",
                    format!("{}{}", server.uri(), RANKING_PATH),
                )),
        )
        .unwrap();
        LiveRanking::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn scrapes_players_from_the_ranking_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RANKING_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(ranking_page(3)))
            .expect(1)
            .mount(&server)
            .await;

        let ranking = client_for(&server).ranking().await.unwrap();

        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[2].name(), "Player 3");
        assert_eq!(ranking[2].points(), 9997);
    }

    #[tokio::test]
    async fn non_success_status_is_an_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RANKING_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).ranking().await;

        assert!(matches!(result, Err(RankingError::Http(_))));
    }

    #[tokio::test]
    async fn malformed_row_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RANKING_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(page(&[row("1", "A", "lots")])),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).ranking().await;

        assert!(matches!(result, Err(RankingError::Parse(_))));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_http_error() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        drop(server);

        let result = client.ranking().await;

        assert!(matches!(result, Err(RankingError::Http(_))));
    }
}
