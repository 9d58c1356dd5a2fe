//! Answer orchestrator - drives the tool-calling loop
//!
//! PROMPT → MODEL → (TOOLS → MODEL)* → ANSWER → REMEMBER

use crate::config::AppConfig;
use crate::error::ChatError;
use crate::fetchers::DataFetcher;
use crate::llm::{ChatModel, GeminiClient};
use crate::memory::{ContextManager, ConversationStore, InMemoryConversationStore};
use crate::models::{ChatAnswer, CompletionRequest, ModelMessage, ModelResponse, ToolChoice, Turn};
use crate::tools::{ToolDispatcher, ToolRegistry};
use crate::Result;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

const EMPTY_ANSWER_FALLBACK: &str = "I'm sorry, I couldn't put together an answer for that. \
Could you rephrase your question? For specific financial decisions, please consult a \
SEBI-registered investment adviser.";

pub const SYSTEM_PROMPT: &str = r#"You are a helpful financial advisor chatbot specializing in Indian personal finance. You give clear, simple explanations about:

1. TAXATION: Income tax slabs, old vs new regime, GST, deductions under 80C, 80D and other sections
2. MUTUAL FUNDS: Equity, debt and hybrid funds, SIP, NAV, expense ratio, risk profiles
3. INSURANCE: Term and life insurance, health insurance, ULIPs, claim processes
4. GOVERNMENT SCHEMES: PPF, EPF, NPS, Sukanya Samriddhi, Atal Pension Yojana, PM Kisan and similar
5. MARKETS: Stocks, gold and cryptocurrency prices

Tools:
- Use get_stock_price, get_crypto_price, get_mutual_fund_nav and get_gold_rate whenever the user asks for a current price, rate or NAV.
- Use web_search for recent news, current interest rates, changed rules or anything you are not sure is up to date.
- Never invent live numbers. If a tool reports that data is unavailable, say so and point the user to the sources it names.

Guidelines:
- Keep explanations simple and jargon-free, with examples where helpful
- Focus on the Indian financial context and use ₹ for amounts
- Give actionable information
- For specific financial advice, remind users to consult a certified financial advisor

Always be helpful, accurate and responsible with financial information."#;

/// Main orchestrator that coordinates model rounds, tools and memory
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    dispatcher: ToolDispatcher,
    registry: ToolRegistry,
    store: Arc<dyn ConversationStore>,
    context_manager: ContextManager,
    temperature: f32,
    max_tool_rounds: usize,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        dispatcher: ToolDispatcher,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            model,
            dispatcher,
            registry: ToolRegistry::new(),
            store,
            context_manager: ContextManager::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Wire the production graph: Gemini, public data fetchers, in-memory history
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher = DataFetcher::new(config.data_sources.clone())
            .map_err(|e| ChatError::Configuration(e.to_string()))?;
        let model = GeminiClient::new(&config.llm)?;

        Ok(Self::new(
            Arc::new(model),
            ToolDispatcher::new(fetcher),
            Arc::new(InMemoryConversationStore::new()),
        )
        .with_temperature(config.llm.temperature)
        .with_max_tool_rounds(config.max_tool_rounds))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds.max(1);
        self
    }

    pub fn with_context_manager(mut self, context_manager: ContextManager) -> Self {
        self.context_manager = context_manager;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Names of the public data sources behind the tools
    pub fn data_sources(&self) -> Vec<&'static str> {
        self.dispatcher.fetcher().source_names()
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Answer one user message and remember the exchange
    pub async fn chat(&self, conversation_id: &str, message: &str) -> Result<ChatAnswer> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::Validation("Message is required".to_string()));
        }

        let start_time = Instant::now();

        // Same-id requests run one after another
        let _guard = self.store.lock(conversation_id).await;

        let history = self.store.get(conversation_id).await?;
        info!(
            conversation_id,
            history_turns = history.len(),
            "Orchestrator: answering message"
        );

        let outcome = self.answer(&history, message).await?;

        self.store
            .append(
                conversation_id,
                vec![Turn::user(message), Turn::assistant(outcome.text.clone())],
            )
            .await?;

        info!(
            conversation_id,
            tool_rounds = outcome.rounds,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Orchestrator: answer ready"
        );

        Ok(ChatAnswer {
            conversation_id: conversation_id.to_string(),
            response: outcome.text,
            tool_rounds: outcome.rounds,
            tools_used: outcome.tools_used,
        })
    }

    /// Forget a conversation; unknown ids are fine
    pub async fn clear(&self, conversation_id: &str) -> Result<()> {
        let _guard = self.store.lock(conversation_id).await;
        self.store.delete(conversation_id).await?;
        info!(conversation_id, "Conversation cleared");
        Ok(())
    }

    /// Run model rounds until the model answers in text
    async fn answer(&self, history: &[Turn], message: &str) -> Result<AnswerOutcome> {
        let mut messages = self.context_manager.prepare_context_for_llm(history);
        messages.push(ModelMessage::User(message.to_string()));

        let mut request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            messages,
            tools: self.registry.specs().to_vec(),
            temperature: self.temperature,
            tool_choice: ToolChoice::Auto,
        };

        let mut rounds = 0;
        let mut tools_used = Vec::new();

        loop {
            if rounds >= self.max_tool_rounds {
                // Out of tool budget: the model has to answer with what it has
                request.tool_choice = ToolChoice::None;
            }

            debug!(round = rounds, tool_choice = ?request.tool_choice, "Requesting completion");

            let (text, calls) = match self.model.complete(&request).await? {
                ModelResponse::Text(text) => {
                    return Ok(AnswerOutcome::new(text, rounds, tools_used));
                }
                ModelResponse::ToolCalls { text, calls } => (text, calls),
            };

            if request.tool_choice == ToolChoice::None {
                warn!(
                    "Model requested {} tool(s) after the round limit of {}, ignoring",
                    calls.len(),
                    self.max_tool_rounds
                );
                return Ok(AnswerOutcome::new(text.unwrap_or_default(), rounds, tools_used));
            }

            rounds += 1;
            info!(
                round = rounds,
                tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Tool round"
            );

            // Fetchers are independent, so one round runs concurrently;
            // results keep the order of the request
            let results = join_all(calls.iter().map(|call| self.dispatcher.dispatch(call))).await;

            tools_used.extend(calls.iter().map(|c| c.name.clone()));
            request.messages.push(ModelMessage::ToolCalls { text, calls });
            request
                .messages
                .extend(results.into_iter().map(ModelMessage::ToolResult));
        }
    }
}

struct AnswerOutcome {
    text: String,
    rounds: usize,
    tools_used: Vec<String>,
}

impl AnswerOutcome {
    fn new(text: String, rounds: usize, tools_used: Vec<String>) -> Self {
        let text = if text.trim().is_empty() {
            warn!("Model returned an empty answer, using fallback text");
            EMPTY_ANSWER_FALLBACK.to_string()
        } else {
            text
        };

        Self {
            text,
            rounds,
            tools_used,
        }
    }
}
