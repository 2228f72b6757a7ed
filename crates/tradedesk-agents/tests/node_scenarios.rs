//! End-to-end node scenarios: scripted reasoners driving both roles against
//! one shared supervisor state, with real tool execution over canned market
//! data and a paper broker.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal_macros::dec;
use tradedesk_agents::test_support::{test_tool_provider, ScriptedReasoner};
use tradedesk_agents::{AgentError, AgentNode, AgentRole, NodeOutcome};
use tradedesk_models::transcript::{Message, Role, ToolCall};
use tradedesk_models::{SupervisorState, DEMO_WALLET_ADDRESS};
use tradedesk_tools::test_support::StaticIndicatorSource;
use tradedesk_tools::{DefaultToolProvider, PaperBroker, ToolProvider};

fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

fn tasked(query: &str, task: &str) -> SupervisorState {
    let mut state = SupervisorState::new(query);
    state.assign_task(task);
    state
}

#[tokio::test]
async fn finance_answer_lands_under_first_step_key() {
    let reasoner = Arc::new(ScriptedReasoner::new().reply(vec![
        Message::tool_request(vec![call(
            "call_1",
            "pivotpoints",
            serde_json::json!({"symbol": "BTC/USDT"}),
        )]),
        Message::assistant("pivot = 42150"),
    ]));
    let node = AgentNode::finance(reasoner, test_tool_provider());
    let mut state = tasked("Should I buy BTC?", "what is BTC pivot point");

    let outcome = node.run(&mut state).await.unwrap();

    assert_eq!(outcome.key(), Some("FinanceAgent_step1"));
    assert_eq!(state.context()["FinanceAgent_step1"], "pivot = 42150");
    assert_eq!(state.current_task(), None);

    let run = &state.runs("FinanceAgent")[0];
    assert_eq!(run.agent_name, "finance_agent");
    assert_eq!(run.agent_output.as_deref(), Some("pivot = 42150"));
    // user, tool request, tool result, final answer
    assert_eq!(run.messages.len(), 4);
    let tool_result = &run.messages[2];
    assert_eq!(tool_result.role, Role::Tool);
    assert_eq!(tool_result.tool_call_id.as_deref(), Some("call_1"));
    assert!(tool_result.content.as_deref().unwrap().contains("42150"));
}

#[tokio::test]
async fn repeated_trades_number_their_steps() {
    let reasoner = Arc::new(
        ScriptedReasoner::new()
            .reply(vec![
                Message::tool_request(vec![call(
                    "c1",
                    "buy_tool",
                    serde_json::json!({"asset": "ETH", "amount": 1}),
                )]),
                Message::assistant("bought 1 ETH"),
            ])
            .reply(vec![
                Message::tool_request(vec![call(
                    "c2",
                    "sell_tool",
                    serde_json::json!({"asset": "ETH", "amount": "0.5"}),
                )]),
                Message::assistant("sold 0.5 ETH"),
            ]),
    );
    let node = AgentNode::trade_executor(reasoner, test_tool_provider());
    let mut state = tasked("rebalance", "buy 1 ETH");

    assert_eq!(
        node.run(&mut state).await.unwrap(),
        NodeOutcome::Completed {
            key: "trade_executor_agent_step1".to_string()
        }
    );
    state.assign_task("sell 0.5 ETH");
    assert_eq!(
        node.run(&mut state).await.unwrap(),
        NodeOutcome::Completed {
            key: "trade_executor_agent_step2".to_string()
        }
    );

    assert_eq!(state.runs("trade_executor_agent").len(), 2);
    assert_eq!(state.context()["trade_executor_agent_step1"], "bought 1 ETH");
    assert_eq!(state.context()["trade_executor_agent_step2"], "sold 0.5 ETH");
}

#[tokio::test]
async fn context_only_grows_across_roles() {
    let reasoner = Arc::new(
        ScriptedReasoner::new()
            .reply(vec![Message::assistant("bullish engulfing on 1h")])
            .reply(vec![Message::assistant("bought 0.1 BTC")])
            .reply(vec![Message::assistant("no morning star")]),
    );
    let provider = test_tool_provider();
    let finance = AgentNode::finance(reasoner.clone(), Arc::clone(&provider));
    let trader = AgentNode::trade_executor(reasoner, provider);

    let mut state = tasked("trade BTC on patterns", "check engulfing");
    let mut seen: Vec<(String, serde_json::Value)> = Vec::new();

    for (node, task) in [
        (&finance, None),
        (&trader, Some("buy 0.1 BTC")),
        (&finance, Some("check morning star")),
    ] {
        if let Some(task) = task {
            state.assign_task(task);
        }
        node.run(&mut state).await.unwrap();

        for (key, value) in &seen {
            assert_eq!(&state.context()[key.as_str()], value, "{key} changed");
        }
        seen = state
            .context()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
    }

    let keys: Vec<&str> = state.context().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "FinanceAgent_step1",
            "trade_executor_agent_step1",
            "FinanceAgent_step2"
        ]
    );
}

#[tokio::test]
async fn each_role_is_bound_only_its_own_tools() {
    let reasoner = Arc::new(
        ScriptedReasoner::new()
            .reply(vec![Message::assistant("a")])
            .reply(vec![Message::assistant("b")]),
    );
    let provider = test_tool_provider();
    let finance = AgentNode::finance(reasoner.clone(), Arc::clone(&provider));
    let trader = AgentNode::trade_executor(reasoner.clone(), provider);

    let mut state = tasked("q", "analyze");
    finance.run(&mut state).await.unwrap();
    state.assign_task("trade");
    trader.run(&mut state).await.unwrap();

    let invocations = reasoner.invocations();
    assert_eq!(
        invocations[0].tool_names,
        vec!["pivotpoints", "engulfing", "three_white_soldiers", "morningstar"]
    );
    assert_eq!(invocations[1].tool_names, vec!["buy_tool", "sell_tool"]);
    assert!(invocations[0]
        .tool_names
        .iter()
        .all(|name| !invocations[1].tool_names.contains(name)));
    assert!(invocations.iter().all(|i| !i.parallel_tool_calls));
}

#[tokio::test]
async fn finance_cannot_reach_trade_tools() {
    let reasoner = Arc::new(ScriptedReasoner::new().reply(vec![
        Message::tool_request(vec![call(
            "c1",
            "buy_tool",
            serde_json::json!({"asset": "BTC", "amount": 1}),
        )]),
        Message::assistant("could not trade"),
    ]));
    let node = AgentNode::finance(reasoner, test_tool_provider());
    let mut state = tasked("q", "buy BTC");

    node.run(&mut state).await.unwrap();

    let tool_result = &state.runs("FinanceAgent")[0].messages[2];
    assert!(tool_result
        .content
        .as_deref()
        .unwrap()
        .starts_with("Error: "));
}

#[tokio::test]
async fn trade_tool_moves_paper_balances() {
    let broker = Arc::new(PaperBroker::with_balances(
        DEMO_WALLET_ADDRESS,
        BTreeMap::from([("BTC".to_string(), dec!(2))]),
    ));
    let provider: Arc<dyn ToolProvider> = Arc::new(DefaultToolProvider::new(
        Arc::new(StaticIndicatorSource::new()),
        broker.clone(),
        DEMO_WALLET_ADDRESS,
    ));
    let reasoner = Arc::new(ScriptedReasoner::new().reply(vec![
        Message::tool_request(vec![call(
            "c1",
            "sell_tool",
            serde_json::json!({"asset": "btc", "amount": "0.5"}),
        )]),
        Message::assistant("sold 0.5 BTC"),
    ]));
    let node = AgentNode::trade_executor(reasoner, provider);
    let mut state = tasked("take profit", "sell 0.5 BTC");

    node.run(&mut state).await.unwrap();

    assert_eq!(broker.balance(DEMO_WALLET_ADDRESS, "BTC").await, dec!(1.5));
    let receipt: serde_json::Value = serde_json::from_str(
        state.runs("trade_executor_agent")[0].messages[2]
            .content
            .as_deref()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(receipt["status"], "filled");
    assert_eq!(receipt["wallet_address"], DEMO_WALLET_ADDRESS);
}

#[tokio::test]
async fn rerunning_identical_input_builds_identical_record() {
    let script = || {
        Arc::new(ScriptedReasoner::new().reply(vec![
            Message::tool_request(vec![call(
                "c1",
                "engulfing",
                serde_json::json!({"symbol": "ETH/USDT"}),
            )]),
            Message::assistant("bullish engulfing"),
        ]))
    };
    let state = tasked("q", "engulfing on ETH");

    let mut first = state.clone();
    AgentNode::finance(script(), test_tool_provider())
        .run(&mut first)
        .await
        .unwrap();
    let mut second = state.clone();
    AgentNode::finance(script(), test_tool_provider())
        .run(&mut second)
        .await
        .unwrap();

    assert_eq!(first.runs("FinanceAgent"), second.runs("FinanceAgent"));
    assert_eq!(first.context(), second.context());
}

#[tokio::test]
async fn failure_mid_session_keeps_prior_results() {
    let reasoner = Arc::new(
        ScriptedReasoner::new()
            .reply(vec![Message::assistant("pivot = 42150")])
            .fail("rate limited"),
    );
    let node = AgentNode::finance(reasoner, test_tool_provider());
    let mut state = tasked("q", "pivot");
    node.run(&mut state).await.unwrap();

    state.assign_task("engulfing");
    let before = state.clone();
    let err = node.run(&mut state).await.unwrap_err();

    assert!(matches!(err, AgentError::Reasoning(_)));
    assert_eq!(state, before);
    assert_eq!(state.runs("FinanceAgent").len(), 1);
}

#[tokio::test]
async fn role_names_parse_to_nodes() {
    let role: AgentRole = "trade".parse().unwrap();
    let node = AgentNode::new(
        role,
        Arc::new(ScriptedReasoner::new()),
        test_tool_provider(),
    );
    assert_eq!(node.state_key(), "trade_executor_agent");
    assert_eq!(node.role().agent_name(), "trade_executor_agent");
}

#[tokio::test]
async fn untasked_state_passes_through_every_role() {
    for role in AgentRole::ALL {
        let reasoner = Arc::new(ScriptedReasoner::new().reply(vec![Message::assistant("x")]));
        let node = AgentNode::new(role, reasoner.clone(), test_tool_provider());
        let mut state = SupervisorState::new("q");
        state.assign_task("   ");
        let before = state.clone();

        assert_eq!(node.run(&mut state).await.unwrap(), NodeOutcome::Skipped);
        assert_eq!(state, before);
        assert!(reasoner.invocations().is_empty());
    }
}

#[tokio::test]
async fn n_runs_leave_n_records_and_n_keys() {
    const RUNS: usize = 3;
    let mut reasoner = ScriptedReasoner::new();
    for i in 1..=RUNS {
        reasoner = reasoner.reply(vec![Message::assistant(format!("answer {i}"))]);
    }
    let node = AgentNode::finance(Arc::new(reasoner), test_tool_provider());
    let mut state = SupervisorState::new("q");

    for i in 1..=RUNS {
        state.assign_task(format!("task {i}"));
        node.run(&mut state).await.unwrap();
        assert_eq!(state.current_task(), None);
    }

    assert_eq!(state.runs("FinanceAgent").len(), RUNS);
    let keys: Vec<&str> = state.context().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "FinanceAgent_step1",
            "FinanceAgent_step2",
            "FinanceAgent_step3"
        ]
    );
    assert_eq!(state.context()["FinanceAgent_step3"], "answer 3");
}
