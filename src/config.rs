use crate::error::{MenuError, Result};
use std::env;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPLOAD_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    Bedrock,
    Stub,
}

impl ModelProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelProvider::OpenAi),
            "bedrock" => Ok(ModelProvider::Bedrock),
            "stub" => Ok(ModelProvider::Stub),
            other => Err(MenuError::Config(format!(
                "Unknown MODEL_PROVIDER '{}', expected openai, bedrock or stub",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::Bedrock => "bedrock",
            ModelProvider::Stub => "stub",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub model_id: String,
}

/// Process-wide settings. Built once at startup and handed to the clients;
/// nothing reads the environment after that.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub upload_limit: usize,
    pub provider: ModelProvider,
    pub openai: OpenAiConfig,
    pub bedrock: BedrockConfig,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            organization: None,
            project: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        OpenAiConfig {
            api_key: non_empty_var("API_KEY"),
            organization: non_empty_var("ORGANIZATION"),
            project: non_empty_var("PROJECT"),
            base_url: non_empty_var("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: non_empty_var("MENU_MODEL").unwrap_or(defaults.model),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_organization(
        mut self,
        organization: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        self.organization = Some(organization.into());
        self.project = Some(project.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            model_id: DEFAULT_BEDROCK_MODEL.to_string(),
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        BedrockConfig {
            region: non_empty_var("AWS_REGION").or_else(|| non_empty_var("AWS_DEFAULT_REGION")),
            access_key: non_empty_var("AWS_ACCESS_KEY_ID"),
            secret_key: non_empty_var("AWS_SECRET_ACCESS_KEY"),
            model_id: non_empty_var("BEDROCK_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_BEDROCK_MODEL.to_string()),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            provider: ModelProvider::OpenAi,
            openai: OpenAiConfig::default(),
            bedrock: BedrockConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let port = parse_var("PORT")?.unwrap_or(DEFAULT_PORT);
        let upload_limit = parse_var("UPLOAD_LIMIT_BYTES")?.unwrap_or(DEFAULT_UPLOAD_LIMIT);
        let provider = match non_empty_var("MODEL_PROVIDER") {
            Some(value) => ModelProvider::parse(&value)?,
            None => ModelProvider::OpenAi,
        };

        Ok(Config {
            port,
            upload_limit,
            provider,
            openai: OpenAiConfig::from_env(),
            bedrock: BedrockConfig::from_env(),
        })
    }

    pub fn with_upload_limit(mut self, bytes: usize) -> Self {
        self.upload_limit = bytes;
        self
    }

    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.openai = config;
        self.provider = ModelProvider::OpenAi;
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = config;
        self.provider = ModelProvider::Bedrock;
        self
    }

    pub fn with_provider(mut self, provider: ModelProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Model identifier of the selected provider.
    pub fn model(&self) -> &str {
        match self.provider {
            ModelProvider::OpenAi => &self.openai.model,
            ModelProvider::Bedrock => &self.bedrock.model_id,
            ModelProvider::Stub => "stub",
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| MenuError::Config(format!("{} has an invalid value: '{}'", name, raw))),
        None => Ok(None),
    }
}
