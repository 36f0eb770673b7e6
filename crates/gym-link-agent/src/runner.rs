//! Agent-driven episode loop.
//!
//! The runner prompts an agent, scans its free-text reply for a tool
//! call, executes the call, and feeds the outcome back as the next
//! prompt. An episode never panics or returns `Err`: every failure is
//! folded into the [`EpisodeResult`] it produces.

use std::sync::OnceLock;

use futures::future::join_all;
use gym_link_core::{EpisodeResult, Result, ToolDefinition};
use gym_link_tools::formats::describe_tools;
use gym_link_tools::{Tool, ToolArgs};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::AgentFn;

const DEFAULT_MAX_STEPS: usize = 50;

/// Runs episodes by alternating agent prompts with tool execution.
#[derive(Debug, Clone)]
pub struct EpisodeRunner {
    agent: AgentFn,
    max_steps: usize,
}

impl EpisodeRunner {
    pub fn new(agent: AgentFn) -> Self {
        Self {
            agent,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Run one episode against the given tools.
    ///
    /// If a `reset_env` tool is present it is invoked first and its
    /// observation seeds the initial prompt. The episode ends when the
    /// environment reports `terminated` or `truncated`, when the agent
    /// stops producing a parseable tool call, or at the step cap.
    pub async fn run_episode(&self, tools: &[Tool], episode_num: usize) -> EpisodeResult {
        let mut state = EpisodeState::new(episode_num);
        if let Err(err) = self.drive(tools, &mut state).await {
            warn!(episode = episode_num, error = %err, "episode aborted");
            state.error = Some(err.to_string());
        }
        state.finish()
    }

    /// Run `count` episodes one after another.
    pub async fn run_episodes(&self, tools: &[Tool], count: usize) -> Vec<EpisodeResult> {
        let mut results = Vec::with_capacity(count);
        for episode_num in 1..=count {
            results.push(self.run_episode(tools, episode_num).await);
        }
        results
    }

    /// Run `count` episodes concurrently.
    ///
    /// Only sensible when each episode gets its own environment, or
    /// the server keeps per-connection sessions.
    pub async fn run_episodes_concurrent(&self, tools: &[Tool], count: usize) -> Vec<EpisodeResult> {
        join_all((1..=count).map(|episode_num| self.run_episode(tools, episode_num))).await
    }

    async fn drive(&self, tools: &[Tool], state: &mut EpisodeState) -> Result<()> {
        match tools.iter().find(|t| t.name() == "reset_env") {
            Some(reset) => {
                let body = reset.invoke(ToolArgs::new()).await?;
                state.observation = extract_observation(&body);
            }
            None => debug!(
                episode = state.episode_num,
                "no reset tool bound, starting without an observation"
            ),
        }

        let defs: Vec<ToolDefinition> = tools.iter().map(|t| t.definition().clone()).collect();
        let names: Vec<&str> = tools.iter().map(Tool::name).collect();
        let mut prompt = initial_prompt(&defs, state.observation.as_ref());

        'cycle: for step in 1..=self.max_steps {
            let response = self.agent.respond(prompt).await?;
            state.num_steps = step;

            let calls = parse_tool_calls(&response, &names);
            if calls.is_empty() {
                debug!(episode = state.episode_num, step, "no parseable tool call, ending episode");
                break;
            }

            // Calls within one decision cycle run in order, not
            // concurrently: later prompts may depend on earlier results.
            let mut last_body = Value::Null;
            for call in calls {
                // parse only yields known names.
                let Some(tool) = tools.iter().find(|t| t.name() == call.name) else {
                    continue;
                };
                let mut args = ToolArgs::new();
                for value in call.positional {
                    args = args.pos(value);
                }
                for (key, value) in call.named {
                    args = args.arg(key, value);
                }
                let body = tool.invoke(args).await?;

                if let Some(reward) = body.get("reward").and_then(Value::as_f64) {
                    state.total_reward += reward;
                }
                if let Some(obs) = extract_observation(&body) {
                    state.observation = Some(obs);
                }
                if truthy(body.get("terminated")) || truthy(body.get("truncated")) {
                    debug!(episode = state.episode_num, step, "environment reported episode end");
                    break 'cycle;
                }
                last_body = body;
            }
            prompt = followup_prompt(&last_body, state.total_reward, step);
        }
        Ok(())
    }
}

/// Mutable per-episode bookkeeping, folded into an [`EpisodeResult`].
struct EpisodeState {
    episode_num: usize,
    total_reward: f64,
    num_steps: usize,
    observation: Option<Value>,
    error: Option<String>,
}

impl EpisodeState {
    fn new(episode_num: usize) -> Self {
        Self {
            episode_num,
            total_reward: 0.0,
            num_steps: 0,
            observation: None,
            error: None,
        }
    }

    // Success is judged in exactly one place so sequential and
    // concurrent runs can never disagree.
    fn finish(self) -> EpisodeResult {
        EpisodeResult {
            episode_num: self.episode_num,
            total_reward: self.total_reward,
            num_steps: self.num_steps,
            success: self.total_reward > 0.0,
            observation: self.observation,
            error: self.error,
        }
    }
}

/// One tool call scanned out of an agent response.
#[derive(Debug, PartialEq)]
struct ParsedCall {
    name: String,
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

/// Every `name(args)` occurrence in the response whose name matches a
/// known tool, in order of appearance. Prose like "I think(maybe)" is
/// skipped rather than treated as a call. Arguments may be positional
/// or `key=value`.
fn parse_tool_calls(response: &str, known: &[&str]) -> Vec<ParsedCall> {
    static CALL: OnceLock<Regex> = OnceLock::new();
    let pattern = CALL.get_or_init(|| {
        // Hard-coded pattern, compiles by construction.
        Regex::new(r"(\w+)\s*\(\s*([^)]*?)\s*\)").expect("tool call pattern")
    });

    let mut calls = Vec::new();
    for caps in pattern.captures_iter(response) {
        let name = &caps[1];
        if !known.contains(&name) {
            continue;
        }
        let mut call = ParsedCall {
            name: name.to_string(),
            positional: Vec::new(),
            named: Vec::new(),
        };
        for segment in caps[2].trim().split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) if is_identifier(key.trim()) => {
                    call.named.push((key.trim().to_string(), coerce_arg(value)));
                }
                _ => call.positional.push(coerce_arg(segment)),
            }
        }
        calls.push(call);
    }
    calls
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Interpret one textual argument as JSON.
///
/// Quoted text becomes a string, bare integers and single-dot decimals
/// become numbers, `true`/`false` become booleans, and anything else
/// stays a string.
fn coerce_arg(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')))
    {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::from(n);
        }
    }
    if raw.matches('.').count() == 1 {
        if let Ok(f) = raw.parse::<f64>() {
            return Value::from(f);
        }
    }
    Value::String(raw.to_string())
}

fn extract_observation(body: &Value) -> Option<Value> {
    body.get("observation").cloned()
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

fn initial_prompt(defs: &[ToolDefinition], observation: Option<&Value>) -> String {
    let mut prompt = String::from(
        "You control an environment through tool calls.\n\nAvailable tools:\n",
    );
    prompt.push_str(&describe_tools(defs));
    match observation {
        Some(obs) => prompt.push_str(&format!("\nCurrent observation: {obs}\n")),
        None => prompt.push_str("\nThe environment has not produced an observation yet.\n"),
    }
    prompt.push_str("\nRespond with exactly one tool call, e.g. step_env(0).");
    prompt
}

fn followup_prompt(body: &Value, total_reward: f64, step: usize) -> String {
    let mut prompt = format!("Step {step} result: {body}\n");
    prompt.push_str(&format!("Total reward so far: {total_reward}\n"));
    prompt.push_str("\nRespond with exactly one tool call, or anything else to stop.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gym_link_client::{Options, ToolTransport};
    use gym_link_core::{EnvInfo, GymLinkError, ToolSchema};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Transport that answers `step_env` from a script, in order.
    struct ScriptedTransport {
        steps: Mutex<VecDeque<Value>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
            })
        }
    }

    #[async_trait]
    impl ToolTransport for ScriptedTransport {
        fn server_url(&self) -> &str {
            "http://localhost:8000"
        }

        async fn call_tool(&self, name: &str, _params: Options) -> gym_link_core::Result<Value> {
            match name {
                "reset_env" => Ok(json!({"observation": [0.0, 0.0], "info": {}})),
                "step_env" => self
                    .steps
                    .lock()
                    .unwrap()
                    .pop_front()
                    .ok_or_else(|| GymLinkError::RemoteCallFailed("script exhausted".into())),
                other => Err(GymLinkError::RemoteCallFailed(format!("unexpected tool {other}"))),
            }
        }

        async fn list_tools(&self) -> gym_link_core::Result<Vec<Value>> {
            Ok(Vec::new())
        }

        async fn env_info(&self) -> gym_link_core::Result<EnvInfo> {
            Ok(EnvInfo::default())
        }

        async fn health_check(&self, _force: bool) -> bool {
            true
        }

        fn close(&self) {}
    }

    fn tools(transport: Arc<ScriptedTransport>) -> Vec<Tool> {
        let step_schema = ToolSchema::from_value(&json!({
            "type": "object",
            "properties": {"action": {"type": "integer"}},
            "required": ["action"]
        }))
        .unwrap();
        vec![
            Tool::new(
                ToolDefinition::new("reset_env", "Reset", ToolSchema::default(), "http://x").unwrap(),
                Arc::clone(&transport) as Arc<dyn ToolTransport>,
            ),
            Tool::new(
                ToolDefinition::new("step_env", "Step", step_schema, "http://x").unwrap(),
                transport,
            ),
        ]
    }

    #[tokio::test]
    async fn test_unparseable_response_ends_after_one_step() {
        let transport = ScriptedTransport::new(vec![]);
        let runner = EpisodeRunner::new(AgentFn::blocking(|_| "I have no idea.".to_string()));

        let result = runner.run_episode(&tools(transport), 1).await;
        assert_eq!(result.num_steps, 1);
        assert_eq!(result.total_reward, 0.0);
        assert!(!result.success);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_episode_accumulates_reward_until_terminated() {
        let transport = ScriptedTransport::new(vec![
            json!({"observation": [0.1], "reward": 1.0, "terminated": false, "truncated": false}),
            json!({"observation": [0.2], "reward": 1.0, "terminated": true, "truncated": false}),
        ]);
        let runner = EpisodeRunner::new(AgentFn::blocking(|_| "step_env(1)".to_string()));

        let result = runner.run_episode(&tools(transport), 1).await;
        assert_eq!(result.num_steps, 2);
        assert_eq!(result.total_reward, 2.0);
        assert!(result.success);
        assert_eq!(result.observation, Some(json!([0.2])));
    }

    #[tokio::test]
    async fn test_step_cap_bounds_episode() {
        let steps = (0..10)
            .map(|_| json!({"observation": [0.0], "reward": 0.0, "terminated": false}))
            .collect();
        let transport = ScriptedTransport::new(steps);
        let runner =
            EpisodeRunner::new(AgentFn::blocking(|_| "step_env(0)".to_string())).with_max_steps(3);

        let result = runner.run_episode(&tools(transport), 1).await;
        assert_eq!(result.num_steps, 3);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_tool_failure_is_captured_not_raised() {
        // Script exhausted on the first step: the tool call errors.
        let transport = ScriptedTransport::new(vec![]);
        let runner = EpisodeRunner::new(AgentFn::blocking(|_| "step_env(1)".to_string()));

        let result = runner.run_episode(&tools(transport), 4).await;
        assert_eq!(result.episode_num, 4);
        assert!(result.error.is_some());
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_run_episodes_numbers_sequentially() {
        let transport = ScriptedTransport::new(vec![
            json!({"reward": 1.0, "terminated": true}),
            json!({"reward": 1.0, "terminated": true}),
        ]);
        let runner = EpisodeRunner::new(AgentFn::blocking(|_| "step_env(0)".to_string()));

        let results = runner.run_episodes(&tools(transport), 2).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].episode_num, 1);
        assert_eq!(results[1].episode_num, 2);
    }

    #[test]
    fn test_parse_tool_calls_skip_prose() {
        let known = ["step_env", "reset_env"];
        let calls = parse_tool_calls("I think(maybe) we should step_env(2, 'fast')", &known);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "step_env");
        assert_eq!(calls[0].positional, vec![json!(2), json!("fast")]);
        assert!(calls[0].named.is_empty());

        assert!(parse_tool_calls("no call here", &known).is_empty());
        assert!(parse_tool_calls("unknown_tool(1)", &known).is_empty());
    }

    #[test]
    fn test_parse_tool_calls_in_order() {
        let known = ["step_env", "reset_env"];
        let calls = parse_tool_calls("reset_env(seed=42) then step_env(0)", &known);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "reset_env");
        assert_eq!(calls[0].named, vec![("seed".to_string(), json!(42))]);
        assert_eq!(calls[1].name, "step_env");
        assert_eq!(calls[1].positional, vec![json!(0)]);
    }

    #[test]
    fn test_parse_tool_call_empty_arguments() {
        let known = ["reset_env"];
        let calls = parse_tool_calls("reset_env()", &known);
        assert_eq!(calls.len(), 1);
        assert!(calls[0].positional.is_empty() && calls[0].named.is_empty());
    }

    #[test]
    fn test_coerce_arg_shapes() {
        assert_eq!(coerce_arg("\"left\""), json!("left"));
        assert_eq!(coerce_arg("'right'"), json!("right"));
        assert_eq!(coerce_arg("42"), json!(42));
        assert_eq!(coerce_arg("-7"), json!(-7));
        assert_eq!(coerce_arg("0.5"), json!(0.5));
        assert_eq!(coerce_arg("true"), json!(true));
        assert_eq!(coerce_arg("False"), json!(false));
        assert_eq!(coerce_arg("TRUE"), json!(true));
        assert_eq!(coerce_arg("north"), json!("north"));
        assert_eq!(coerce_arg("1.2.3"), json!("1.2.3"));
    }

    #[test]
    fn test_truthy_values() {
        assert!(truthy(Some(&json!(true))));
        assert!(truthy(Some(&json!(1))));
        assert!(truthy(Some(&json!("done"))));
        assert!(!truthy(Some(&json!(false))));
        assert!(!truthy(Some(&json!(0))));
        assert!(!truthy(Some(&json!(null))));
        assert!(!truthy(None));
    }
}
