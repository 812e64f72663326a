use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use versecrew_config::{AgentConfig, CrewConfig, TaskConfig};
use versecrew_core::{AgentError, ChatModel, LlmMetrics, LlmResponse, Message};
use versecrew_monitor::{InMemoryCollector, MetricsCollector, RunCollector, RunStatus, RunStore};
use versecrew_tools::{Tool, ToolRegistry};

use super::*;

/// Replays canned replies and records what it was asked.
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Vec<Message>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, system_prompt: &str, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), messages.to_vec()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Final Answer: (script exhausted)".to_string()));
        match reply {
            Ok(content) => Ok(LlmResponse {
                content,
                metrics: LlmMetrics { input_tokens: 10, output_tokens: 5, elapsed_ms: 1 },
            }),
            Err(e) => Err(AgentError::LlmError(e)),
        }
    }
}

/// Returns a fixed result and remembers every input.
struct FixedTool {
    name: &'static str,
    result: Result<&'static str, &'static str>,
    inputs: Mutex<Vec<String>>,
}

impl FixedTool {
    fn ok(name: &'static str, result: &'static str) -> Arc<Self> {
        Arc::new(Self { name, result: Ok(result), inputs: Mutex::new(Vec::new()) })
    }

    fn failing(name: &'static str, error: &'static str) -> Arc<Self> {
        Arc::new(Self { name, result: Err(error), inputs: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl Tool for FixedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    async fn call(&self, input: &str) -> Result<String, AgentError> {
        self.inputs.lock().unwrap().push(input.to_string());
        self.result
            .map(str::to_string)
            .map_err(|e| AgentError::ExternalApi(e.to_string()))
    }
}

fn biblical_tools() -> (ToolRegistry, Arc<FixedTool>) {
    let search = FixedTool::ok("search_internet", "Title: John 3:16 commentary");
    let mut tools = ToolRegistry::new();
    tools.register(search.clone());
    tools.register(FixedTool::ok("search_places", "Title: Jerusalem"));
    tools.register(FixedTool::ok("duckduckgo_search", "ddg text"));
    tools.register(FixedTool::ok("bible_question", "Paul"));
    (tools, search)
}

fn runner(config: CrewConfig, tools: ToolRegistry, model: Arc<ScriptedModel>) -> CrewRunner {
    CrewRunner::new(config, tools, ModelResolver::new(model)).unwrap()
}

fn single_agent_crew(tools: Vec<&str>, max_iterations: Option<u32>) -> CrewConfig {
    CrewConfig {
        id: "solo".into(),
        name: "Solo".into(),
        description: String::new(),
        agents: vec![AgentConfig {
            id: "linguist".into(),
            role: "Biblical Linguist".into(),
            goal: "Explain {verse}".into(),
            backstory: "Knows Greek".into(),
            tools: tools.into_iter().map(String::from).collect(),
            allow_delegation: false,
            model: None,
            max_iterations,
            verbose: false,
        }],
        tasks: vec![TaskConfig {
            id: "language".into(),
            description: "Analyze the language of {verse}".into(),
            agent: "linguist".into(),
            expected_output: None,
        }],
        kickoff: vec![],
        process: Default::default(),
    }
}

#[tokio::test]
async fn test_action_then_final_answer() {
    let (tools, search) = biblical_tools();
    let model = ScriptedModel::new(&[
        "Thought: look it up\nAction: search_internet\nAction Input: John 3:16 Greek\nObservation: invented",
        "Thought: I now know the final answer\nFinal Answer: agapao means to love.",
    ]);
    let crew = runner(single_agent_crew(vec!["search_internet"], None), tools, model.clone());
    let collector = InMemoryCollector::new("solo");

    let out = crew.kickoff("John 3:16", &collector).await.unwrap();

    assert_eq!(out.final_output, "agapao means to love.");
    assert_eq!(search.inputs.lock().unwrap().as_slice(), ["John 3:16 Greek"]);

    let calls = model.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].0.contains("Explain John 3:16"));
    assert!(calls[0].1[0].content.contains("Analyze the language of John 3:16"));
    let second = &calls[1].1;
    assert_eq!(second.len(), 3);
    assert!(!second[1].content.contains("invented"));
    assert_eq!(second[2], Message::user("Observation: Title: John 3:16 commentary"));

    let metrics = &out.metrics.task_metrics[0];
    assert_eq!(metrics.iteration_count, 2);
    assert_eq!(metrics.tool_call_count, 1);
    assert_eq!(metrics.input_tokens, 20);
    assert_eq!(metrics.output_tokens, 10);
}

#[tokio::test]
async fn test_unavailable_tool_and_tool_errors_become_observations() {
    let mut tools = ToolRegistry::new();
    tools.register(FixedTool::failing("search_internet", "connection reset"));
    let model = ScriptedModel::new(&[
        "Action: search_places\nAction Input: Bethlehem",
        "Action: search_internet\nAction Input: Bethlehem",
        "Final Answer: done",
    ]);
    let crew = runner(single_agent_crew(vec!["search_internet"], None), tools, model.clone());

    let out = crew.kickoff("Micah 5:2", &InMemoryCollector::new("solo")).await.unwrap();
    assert_eq!(out.final_output, "done");

    let calls = model.calls();
    let first_obs = &calls[1].1.last().unwrap().content;
    assert_eq!(first_obs, "Observation: Tool 'search_places' is not available. Use one of: search_internet.");
    let second_obs = &calls[2].1.last().unwrap().content;
    assert!(second_obs.contains("Tool error: External API error: connection reset"), "{second_obs}");
}

#[tokio::test]
async fn test_iteration_limit_forces_final_answer() {
    let (tools, _) = biblical_tools();
    let model = ScriptedModel::new(&[
        "Action: search_internet\nAction Input: a",
        "Action: search_internet\nAction Input: b",
        "Final Answer: forced",
    ]);
    let crew = runner(single_agent_crew(vec!["search_internet"], Some(2)), tools, model.clone());

    let out = crew.kickoff("Psalm 23", &InMemoryCollector::new("solo")).await.unwrap();
    assert_eq!(out.final_output, "forced");
    let last_call = model.calls().pop().unwrap();
    assert!(last_call.1.last().unwrap().content.contains("used all the steps"));
}

#[tokio::test]
async fn test_iteration_limit_error_when_model_keeps_acting() {
    let (tools, _) = biblical_tools();
    let model = ScriptedModel::new(&[
        "Action: search_internet\nAction Input: a",
        "Action: search_internet\nAction Input: b",
    ]);
    let crew = runner(single_agent_crew(vec!["search_internet"], Some(1)), tools, model);

    let err = crew.kickoff("Psalm 23", &InMemoryCollector::new("solo")).await.unwrap_err();
    assert!(matches!(err, AgentError::MaxIterationsExceeded(ref id) if id == "linguist"));
}

#[tokio::test]
async fn test_journalist_delegates_to_historian() {
    let (tools, _) = biblical_tools();
    let model = ScriptedModel::new(&[
        // journalist
        "Thought: ask the historian\nAction: delegate_work\nAction Input: Biblical Historian | Describe first-century Judea | article on John 3:16",
        // historian, running the delegated work
        "Action: search_places\nAction Input: Judea",
        "Final Answer: Judea was under Roman rule.",
        // journalist again
        "Final Answer: Article: Judea was under Roman rule when Jesus spoke to Nicodemus.",
    ]);
    let crew = runner(CrewConfig::biblical(), tools, model.clone());
    let collector = InMemoryCollector::new("biblical");

    let out = crew.kickoff("John 3:16", &collector).await.unwrap();
    assert_eq!(
        out.final_output,
        "Article: Judea was under Roman rule when Jesus spoke to Nicodemus."
    );
    assert_eq!(out.task_outputs.len(), 1);
    assert_eq!(out.task_outputs[0].agent_id, "journalist");

    let calls = model.calls();
    assert!(calls[0].0.contains("delegate_work"));
    assert!(calls[1].0.starts_with("You are Biblical Historian."));
    assert!(!calls[1].0.contains("delegate_work"));
    assert!(calls[1].1[0].content.contains("Describe first-century Judea"));
    assert_eq!(
        calls[3].1.last().unwrap().content,
        "Observation: Judea was under Roman rule."
    );

    let metrics = &out.metrics.task_metrics[0];
    assert_eq!(metrics.iteration_count, 4);
    assert_eq!(metrics.tool_call_count, 2);
}

#[tokio::test]
async fn test_delegation_to_unknown_coworker_or_self() {
    let (tools, _) = biblical_tools();
    let model = ScriptedModel::new(&[
        "Action: ask_question\nAction Input: Prophet | Who wrote it?",
        "Action: ask_question\nAction Input: journalist | Who wrote it?",
        "Action: ask_question\nAction Input: nonsense",
        "Final Answer: ok",
    ]);
    let crew = runner(CrewConfig::biblical(), tools, model.clone());
    crew.kickoff("Romans 8:28", &InMemoryCollector::new("biblical")).await.unwrap();

    let calls = model.calls();
    let obs = |i: usize| calls[i].1.last().unwrap().content.clone();
    assert!(obs(1).contains("Coworker 'Prophet' not found"));
    assert!(obs(2).contains("cannot delegate to yourself"));
    assert!(obs(3).contains("Invalid input for ask_question"));
}

#[tokio::test]
async fn test_sequential_tasks_pass_context() {
    let (tools, _) = biblical_tools();
    let mut config = CrewConfig::biblical();
    config.kickoff = vec!["history".into(), "language".into()];
    let model = ScriptedModel::new(&["Final Answer: historical notes", "Final Answer: language notes"]);
    let crew = runner(config, tools, model.clone());

    let out = crew.kickoff("Genesis 1:1", &InMemoryCollector::new("biblical")).await.unwrap();
    assert_eq!(out.final_output, "language notes");
    let ids: Vec<_> = out.task_outputs.iter().map(|t| t.task_id.as_str()).collect();
    assert_eq!(ids, vec!["history", "language"]);

    let calls = model.calls();
    assert!(!calls[0].1[0].content.contains("context you're working with"));
    assert!(calls[1].1[0].content.contains("context you're working with:\nhistorical notes"));
    assert_eq!(out.metrics.task_metrics.len(), 2);
}

#[tokio::test]
async fn test_llm_failure_aborts_kickoff() {
    let (tools, _) = biblical_tools();
    let crew = runner(CrewConfig::biblical(), tools, ScriptedModel::failing("quota exceeded"));
    let err = crew.kickoff("John 1:1", &InMemoryCollector::new("biblical")).await.unwrap_err();
    assert!(err.to_string().contains("quota exceeded"));
}

#[tokio::test]
async fn test_run_collector_receives_spans_and_tool_calls() {
    let (tools, _) = biblical_tools();
    let model = ScriptedModel::new(&[
        "Action: duckduckgo_search\nAction Input: John 3:16",
        "Final Answer: article",
    ]);
    let crew = runner(CrewConfig::biblical(), tools, model);
    let store = Arc::new(RunStore::in_memory().unwrap());
    let collector = RunCollector::begin(store.clone(), "biblical", "Biblical Research Crew", "John 3:16", None);

    let out = crew.kickoff("John 3:16", &collector).await.unwrap();
    collector.success(&out.final_output);

    let run = store.get_run(collector.run_id()).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.total_tool_calls, 1);

    let spans = store.get_spans(collector.run_id()).unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].task_id, "article");
    assert_eq!(spans[0].agent_id, "journalist");
    let calls = store.get_tool_calls(&spans[0].span_id).unwrap();
    assert_eq!(calls[0].tool_name, "duckduckgo_search");
    assert_eq!(calls[0].result, "ddg text");
}

#[test]
fn test_new_rejects_unregistered_tools_and_invalid_config() {
    let model = ScriptedModel::new(&[]);
    let err = CrewRunner::new(CrewConfig::biblical(), ToolRegistry::new(), ModelResolver::new(model.clone()))
        .err()
        .unwrap();
    assert!(matches!(err, AgentError::UnknownTool(ref names) if names.contains("search_internet")));

    let mut bad = CrewConfig::biblical();
    bad.kickoff = vec!["sermon".into()];
    let (tools, _) = biblical_tools();
    assert!(matches!(
        CrewRunner::new(bad, tools, ModelResolver::new(model)),
        Err(AgentError::Config(_))
    ));
}

#[test]
fn test_model_resolver_falls_back_to_default() {
    let default = ScriptedModel::new(&[]);
    let resolver = ModelResolver::new(default).with_model("other", ScriptedModel::new(&[]));
    assert_eq!(resolver.resolve(Some("missing")).model_name(), "scripted");
    assert_eq!(resolver.resolve(None).model_name(), "scripted");
    assert!(Arc::ptr_eq(resolver.resolve(None), resolver.resolve(Some("unknown"))));
}
