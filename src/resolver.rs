//! 书签截图解析模块
//!
//! 按顺序尝试：截图服务A (Microlink) → 截图服务B (ScreenshotOne) → 网站图标 → 文字占位图。
//! 判断逻辑：任一策略返回结果即停止；网络错误、非2xx、响应格式错误均视为"放弃"，
//! 不会向调用方抛出错误。最后的占位图保证总能得到结果。

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ResolverConfig;
use crate::error::Result;
use crate::fallback::{FallbackChain, FallbackStrategy, Resolved};
use crate::url_format::{favicon_url, is_valid_url, placeholder_url};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// 截图请求：目标URL + 显示名称 (占位图使用)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub url: String,
    pub name: String,
}

impl ImageRequest {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// Microlink API 响应
#[derive(Debug, Deserialize)]
struct MicrolinkResponse {
    status: String,
    data: Option<MicrolinkData>,
}

#[derive(Debug, Deserialize)]
struct MicrolinkData {
    screenshot: Option<MicrolinkScreenshot>,
}

#[derive(Debug, Deserialize)]
struct MicrolinkScreenshot {
    url: Option<String>,
}

/// 从 Microlink 响应体中提取截图URL
fn parse_microlink_body(body: &str) -> Option<String> {
    let response: MicrolinkResponse = serde_json::from_str(body).ok()?;
    if response.status != "success" {
        return None;
    }
    response
        .data?
        .screenshot?
        .url
        .filter(|u| !u.is_empty())
}

/// 截图服务A: Microlink (免费额度)
pub struct MicrolinkStrategy {
    client: Client,
    endpoint: String,
    viewport: (u32, u32),
}

impl MicrolinkStrategy {
    pub fn new(client: Client, config: &ResolverConfig) -> Self {
        Self {
            client,
            endpoint: config.microlink_endpoint.clone(),
            viewport: (config.viewport_width, config.viewport_height),
        }
    }

    fn api_url(&self, target: &str) -> Option<Url> {
        let mut api = Url::parse(&self.endpoint).ok()?;
        api.query_pairs_mut()
            .append_pair("url", target)
            .append_pair("viewport.width", &self.viewport.0.to_string())
            .append_pair("viewport.height", &self.viewport.1.to_string())
            .append_pair("screenshot.type", "png")
            .append_pair("embed", "screenshot.url");
        Some(api)
    }
}

impl FallbackStrategy<ImageRequest, String> for MicrolinkStrategy {
    fn name(&self) -> &str {
        "microlink"
    }

    fn attempt<'a>(&'a self, input: &'a ImageRequest) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            if !is_valid_url(&input.url) {
                return None;
            }
            let api = self.api_url(&input.url)?;

            let response = match self.client.get(api).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Microlink request failed for {}: {}", input.url, e);
                    return None;
                }
            };
            if !response.status().is_success() {
                debug!("Microlink returned HTTP {} for {}", response.status(), input.url);
                return None;
            }
            let body = response.text().await.ok()?;
            parse_microlink_body(&body)
        })
    }
}

/// 截图服务B: ScreenshotOne (演示密钥)
///
/// 成功时直接返回请求URL本身，浏览器加载该URL即得到图片。
pub struct ScreenshotOneStrategy {
    client: Client,
    endpoint: String,
    access_key: String,
    viewport: (u32, u32),
}

impl ScreenshotOneStrategy {
    pub fn new(client: Client, config: &ResolverConfig) -> Self {
        Self {
            client,
            endpoint: config.screenshotone_endpoint.clone(),
            access_key: config.screenshotone_access_key.clone(),
            viewport: (config.viewport_width, config.viewport_height),
        }
    }

    fn api_url(&self, target: &str) -> Option<Url> {
        let mut api = Url::parse(&self.endpoint).ok()?;
        api.query_pairs_mut()
            .append_pair("access_key", &self.access_key)
            .append_pair("url", target)
            .append_pair("viewport_width", &self.viewport.0.to_string())
            .append_pair("viewport_height", &self.viewport.1.to_string())
            .append_pair("format", "png")
            .append_pair("block_ads", "true")
            .append_pair("block_cookie_banners", "true");
        Some(api)
    }
}

impl FallbackStrategy<ImageRequest, String> for ScreenshotOneStrategy {
    fn name(&self) -> &str {
        "screenshotone"
    }

    fn attempt<'a>(&'a self, input: &'a ImageRequest) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move {
            if !is_valid_url(&input.url) {
                return None;
            }
            let api = self.api_url(&input.url)?;

            match self.client.get(api.clone()).send().await {
                Ok(response) if response.status().is_success() => Some(api.to_string()),
                Ok(response) => {
                    debug!("ScreenshotOne returned HTTP {} for {}", response.status(), input.url);
                    None
                }
                Err(e) => {
                    debug!("ScreenshotOne request failed for {}: {}", input.url, e);
                    None
                }
            }
        })
    }
}

/// 网站图标：仅由主机名推导，不做网络验证
pub struct FaviconStrategy;

impl FallbackStrategy<ImageRequest, String> for FaviconStrategy {
    fn name(&self) -> &str {
        "favicon"
    }

    fn attempt<'a>(&'a self, input: &'a ImageRequest) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move { favicon_url(&input.url) })
    }
}

/// 文字占位图：最终回退，总是成功
pub struct PlaceholderStrategy;

impl FallbackStrategy<ImageRequest, String> for PlaceholderStrategy {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn attempt<'a>(&'a self, input: &'a ImageRequest) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move { Some(placeholder_url(&input.name)) })
    }
}

/// 截图解析器
pub struct ImageResolver {
    chain: FallbackChain<ImageRequest, String>,
    batch_delay: Duration,
}

impl ImageResolver {
    /// 创建带默认策略链的解析器
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        let chain = FallbackChain::new()
            .with_budget(timeout)
            .push(MicrolinkStrategy::new(client.clone(), config))
            .push(ScreenshotOneStrategy::new(client, config))
            .push(FaviconStrategy)
            .push(PlaceholderStrategy);

        Ok(Self {
            chain,
            batch_delay: config.batch_delay,
        })
    }

    /// 使用自定义策略链 (测试或离线模式)
    pub fn with_chain(chain: FallbackChain<ImageRequest, String>, batch_delay: Duration) -> Self {
        Self { chain, batch_delay }
    }

    /// 仅图标 + 占位图，不发起任何网络请求
    pub fn offline() -> Self {
        let chain = FallbackChain::new()
            .push(FaviconStrategy)
            .push(PlaceholderStrategy);
        Self::with_chain(chain, Duration::ZERO)
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.chain.names()
    }

    /// 解析单个URL，附带成功的策略名称
    pub async fn resolve_with_source(&self, request: &ImageRequest) -> Resolved<String> {
        match self.chain.run(request).await {
            Some(resolved) => resolved,
            None => {
                warn!("All screenshot strategies declined for {}, using placeholder", request.url);
                Resolved {
                    value: placeholder_url(&request.name),
                    source: "placeholder".to_string(),
                }
            }
        }
    }

    /// 解析单个URL (交互式，不延迟)
    pub async fn resolve(&self, url: &str, name: &str) -> String {
        self.resolve_with_source(&ImageRequest::new(url, name))
            .await
            .value
    }

    /// 批量解析：严格顺序执行，每两次调用之间固定延迟以避免触发限流
    pub async fn resolve_batch<F>(
        &self,
        requests: Vec<ImageRequest>,
        progress_callback: F,
    ) -> Vec<(ImageRequest, String)>
    where
        F: Fn(usize, usize, &str),
    {
        let total = requests.len();
        let mut results = Vec::with_capacity(total);

        for (i, request) in requests.into_iter().enumerate() {
            if i > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            let resolved = self.resolve_with_source(&request).await;
            debug!("{} -> {} ({})", request.url, resolved.value, resolved.source);
            progress_callback(i + 1, total, &request.url);
            results.push((request, resolved.value));
        }

        info!("📸 Resolved {} screenshots", results.len());
        results
    }
}

/// 解析器本身可作为更大策略链中的一个策略 (预览截图回退使用)
impl FallbackStrategy<ImageRequest, String> for ImageResolver {
    fn name(&self) -> &str {
        "resolver"
    }

    fn attempt<'a>(&'a self, input: &'a ImageRequest) -> BoxFuture<'a, Option<String>> {
        Box::pin(async move { Some(self.resolve_with_source(input).await.value) })
    }
}
