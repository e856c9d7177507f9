use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use reqwest::Client;

use crate::{
    Calendar, CalendarOptions, Error, Result,
    cache::{CacheBackend, CacheManager, MemoryCache},
    ics::CalendarReader,
};

/// 日历来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarSource {
    /// 本地 `.ics` 文件
    Path(PathBuf),
    /// `http(s)` 订阅地址
    Url(String),
}

impl CalendarSource {
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl FromStr for CalendarSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Config("calendar source is empty".to_string()));
        }

        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Url(s.to_string()));
        }
        // webcal 订阅即 HTTPS
        if lower.starts_with("webcal://") {
            return Ok(Self::Url(format!("https://{}", &s["webcal://".len()..])));
        }
        if lower.contains("://") {
            return Err(Error::Config(format!("unsupported calendar source scheme: {}", s)));
        }

        Ok(Self::Path(PathBuf::from(s)))
    }
}

impl fmt::Display for CalendarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// 日历加载器
///
/// 本地文件直接读取，远程日历在配置了缓存时经过缓存。
pub struct CalendarLoader<C: CacheBackend = MemoryCache> {
    client: Client,
    reader: CalendarReader,
    cache: Option<(CacheManager<C>, Duration)>,
}

impl CalendarLoader<MemoryCache> {
    /// 创建不带缓存的加载器
    pub fn new(options: CalendarOptions) -> Result<Self> {
        Ok(Self {
            client: default_client(Duration::from_secs(30))?,
            reader: CalendarReader::new(options),
            cache: None,
        })
    }
}

impl<C: CacheBackend + 'static> CalendarLoader<C> {
    /// 创建远程日历缓存 `ttl` 的加载器
    pub fn with_cache(options: CalendarOptions, cache: CacheManager<C>, ttl: Duration) -> Result<Self> {
        Ok(Self {
            client: default_client(Duration::from_secs(30))?,
            reader: CalendarReader::new(options),
            cache: Some((cache, ttl)),
        })
    }

    /// 替换 HTTP 客户端（例如修改超时）
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// 加载并解析日历
    pub async fn load(&self, source: &CalendarSource) -> Result<Calendar> {
        let body = self.fetch_body(source).await?;
        self.reader.read_bytes(body.as_bytes())
    }

    /// 删除 `source` 的缓存内容，下次加载时重新下载
    pub async fn invalidate(&self, source: &CalendarSource) -> Result<()> {
        if let (CalendarSource::Url(url), Some((cache, _))) = (source, &self.cache) {
            tracing::debug!("Invalidating cached calendar {}", url);
            cache.remove_calendar_cache(url).await?;
        }
        Ok(())
    }

    /// 获取日历的原始 ICS 文本
    pub async fn fetch_body(&self, source: &CalendarSource) -> Result<String> {
        match source {
            CalendarSource::Path(path) => {
                tracing::debug!("Reading calendar file {}", path.display());
                tokio::fs::read_to_string(path).await.map_err(|e| Error::Source {
                    source_name: path.display().to_string(),
                    message: e.to_string(),
                })
            }
            CalendarSource::Url(url) => {
                if let Some((cache, _)) = &self.cache {
                    match cache.get_cached_calendar(url).await {
                        Ok(Some(body)) => {
                            tracing::debug!("Calendar cache hit for {}", url);
                            return Ok(body);
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!("Calendar cache read failed for {}: {}", url, e),
                    }
                }

                let body = self.download(url).await?;

                if let Some((cache, ttl)) = &self.cache
                    && let Err(e) = cache.cache_calendar(url, &body, *ttl).await
                {
                    tracing::warn!("Failed to cache calendar {}: {}", url, e);
                }

                Ok(body)
            }
        }
    }

    async fn download(&self, url: &str) -> Result<String> {
        tracing::info!("Fetching calendar {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| handle_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Source {
                source_name: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        response.text().await.map_err(|e| handle_request_error(url, e))
    }
}

fn default_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("Active-ICS-Rust/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Error::Http)
}

/// 通用的请求错误处理
fn handle_request_error(url: &str, error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else if error.is_request() || error.is_connect() {
        Error::Source {
            source_name: url.to_string(),
            message: format!("Request failed: {}", error),
        }
    } else {
        Error::Http(error)
    }
}
