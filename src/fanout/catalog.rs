use std::collections::HashMap;
use std::sync::LazyLock;

use crate::fanout::provider::Provider;

/// OpenAI reasoning models. Their system prompt travels under the
/// `developer` role instead of `system`.
pub const OPENAI_REASONING_MODELS: &[&str] = &[
    "o1",
    "o1-2024-12-17",
    "o1-mini",
    "o1-mini-2024-09-12",
    "o1-preview-2024-09-12",
];

/// Standard OpenAI chat-completions models.
pub const OPENAI_CHAT_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-2024-11-20",
    "gpt-4o-2024-08-06",
    "gpt-4o-2024-05-13",
    "chatgpt-4o-latest",
    "gpt-4o-mini-2024-07-18",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4-turbo-2024-04-09",
    "gpt-4-turbo-preview",
    "gpt-4-0125-preview",
    "gpt-4-1106-preview",
    "gpt-4",
    "gpt-4-0613",
    "gpt-4-0314",
    "gpt-3.5-turbo-0125",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-1106",
    "gpt-3.5-turbo-instruct",
];

/// Anthropic messages-API models.
pub const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-sonnet-latest",
    "claude-3-5-haiku-20241022",
    "claude-3-5-haiku-latest",
    "claude-3-opus-20240229",
    "claude-3-opus-latest",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

/// Curated OpenRouter models.
pub const OPENROUTER_CORE_MODELS: &[&str] = &[
    "meta-llama/llama-3.3-70b-instruct",
    "deepseek/deepseek-r1",
    "qwen/qwen-2.5-coder-32b-instruct",
];

/// Extended OpenRouter list.
pub const OPENROUTER_EXTENDED_MODELS: &[&str] = &[
    "deepseek/deepseek-r1-distill-llama-70b",
    "google/gemini-2.0-flash-thinking-exp:free",
    "sophosympatheia/rogue-rose-103b-v0.2:free",
    "minimax/minimax-01",
    "mistralai/codestral-2501",
    "mistralai/codestral-mamba",
    "mistralai/mistral-large-2411",
    "mistralai/ministral-8b",
    "mistralai/ministral-3b",
    "mistralai/mistral-nemo",
    "microsoft/phi-4",
    "deepseek/deepseek-chat",
    "qwen/qvq-72b-preview",
    "qwen/qwq-32b-preview",
    "qwen/qwen-2.5-7b-instruct",
    "x-ai/grok-2-1212",
    "cohere/command-r7b-12-2024",
    "amazon/nova-lite-v1",
    "amazon/nova-micro-v1",
    "amazon/nova-pro-v1",
    "inflection/inflection-3-pi",
    "nousresearch/hermes-3-llama-3.1-70b",
    "google/gemma-2-9b-it",
    "mistralai/mixtral-8x22b-instruct",
    "cognitivecomputations/dolphin-mixtral-8x22b",
];

/// OpenRouter models that accept embedded image references. The only pool
/// for which image content is forwarded on the OpenRouter path.
pub const OPENROUTER_VISION_MODELS: &[&str] = &[
    "x-ai/grok-2-vision-1212",
    "meta-llama/llama-3.2-90b-vision-instruct",
];

/// Disjoint model pool. Membership determines the provider adapter and the
/// payload shape used for a given identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPool {
    OpenaiReasoning,
    OpenaiChat,
    Anthropic,
    OpenrouterCore,
    OpenrouterExtended,
    OpenrouterVision,
}

impl ModelPool {
    pub const ALL: [ModelPool; 6] = [
        Self::OpenaiReasoning,
        Self::OpenaiChat,
        Self::Anthropic,
        Self::OpenrouterCore,
        Self::OpenrouterExtended,
        Self::OpenrouterVision,
    ];

    pub fn provider(self) -> Provider {
        match self {
            Self::OpenaiReasoning | Self::OpenaiChat => Provider::Openai,
            Self::Anthropic => Provider::Anthropic,
            Self::OpenrouterCore | Self::OpenrouterExtended | Self::OpenrouterVision => {
                Provider::Openrouter
            }
        }
    }

    pub fn models(self) -> &'static [&'static str] {
        match self {
            Self::OpenaiReasoning => OPENAI_REASONING_MODELS,
            Self::OpenaiChat => OPENAI_CHAT_MODELS,
            Self::Anthropic => ANTHROPIC_MODELS,
            Self::OpenrouterCore => OPENROUTER_CORE_MODELS,
            Self::OpenrouterExtended => OPENROUTER_EXTENDED_MODELS,
            Self::OpenrouterVision => OPENROUTER_VISION_MODELS,
        }
    }

    pub fn supports_vision(self) -> bool {
        matches!(self, Self::OpenrouterVision)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OpenaiReasoning => "OpenAI reasoning",
            Self::OpenaiChat => "OpenAI chat",
            Self::Anthropic => "Anthropic",
            Self::OpenrouterCore => "OpenRouter core",
            Self::OpenrouterExtended => "OpenRouter extended",
            Self::OpenrouterVision => "OpenRouter vision",
        }
    }
}

static POOL_BY_MODEL: LazyLock<HashMap<&'static str, ModelPool>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for pool in ModelPool::ALL {
        for model in pool.models() {
            map.insert(*model, pool);
        }
    }
    map
});

/// Classifies a model identifier. `None` means the identifier belongs to no
/// known pool.
pub fn resolve(model: &str) -> Option<ModelPool> {
    POOL_BY_MODEL.get(model).copied()
}
