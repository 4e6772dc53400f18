mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::time::Instant;

use common::*;
use inbox_pilot::automation::page::{InjectionOutcome, SenderPolicy};
use inbox_pilot::automation::state::RunContext;
use inbox_pilot::automation::{Autopilot, RunOptions, NO_CHATS_ALERT};
use inbox_pilot::models::{ConversationTurn, RunConfig, RunPhase, RunStats, StatusEvent};

fn pilot(page: FakePage, generator: ScriptedGenerator, sink: RecordingSink) -> Autopilot<FakePage> {
    Autopilot::new(page, Box::new(generator), Arc::new(sink), options())
}

fn stats_events(events: &[StatusEvent]) -> Vec<RunStats> {
    events
        .iter()
        .filter_map(|e| match e {
            StatusEvent::Stats { stats } => Some(*stats),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn mixed_inbox_counts_each_outcome() {
    let page = FakePage::new(vec![
        FakeChat::named("ana", vec![incoming("hey"), outgoing("hi ana")]),
        FakeChat::named("ben", vec![outgoing("how was it?"), incoming("great, thanks")]),
        FakeChat::named("cy", vec![incoming("you there?")]),
    ]);
    let generator = ScriptedGenerator::new(vec![Ok("glad to hear!".into()), api_error()]);
    let sink = RecordingSink::default();

    let mut ctx = RunContext::new(run_config(20));
    let phase = pilot(page.clone(), generator.clone(), sink.clone()).run(&mut ctx).await;

    assert_eq!(phase, RunPhase::Completed);
    assert_eq!(ctx.stats(), RunStats { processed: 3, responded: 1, skipped: 2 });
    assert_eq!(page.sent(), vec![(1, "glad to hear!".to_string())]);
    // chat 1 never reached the generator
    assert_eq!(generator.calls().len(), 2);

    let events = sink.events();
    assert_eq!(events.last(), Some(&StatusEvent::Completed));
    for stats in stats_events(&events) {
        assert_eq!(stats.processed, stats.responded + stats.skipped);
    }
}

#[tokio::test]
async fn outgoing_last_message_is_skipped_without_generation() {
    let page = FakePage::new(vec![FakeChat::named("dee", vec![incoming("yo"), outgoing("sup")])]);
    let generator = ScriptedGenerator::new(vec![Ok("unused".into())]);

    let mut ctx = RunContext::new(run_config(5));
    pilot(page.clone(), generator.clone(), RecordingSink::default())
        .run(&mut ctx)
        .await;

    assert!(generator.calls().is_empty());
    assert!(page.sent().is_empty());
    assert_eq!(ctx.stats(), RunStats { processed: 1, responded: 0, skipped: 1 });
}

#[tokio::test]
async fn empty_discovery_alerts_and_completes() {
    let generator = ScriptedGenerator::new(vec![]);
    let sink = RecordingSink::default();

    let mut ctx = RunContext::new(run_config(5));
    let phase = pilot(FakePage::new(vec![]), generator.clone(), sink.clone())
        .run(&mut ctx)
        .await;

    assert_eq!(phase, RunPhase::Completed);
    assert_eq!(ctx.stats(), RunStats::default());
    assert!(generator.calls().is_empty());
    assert_eq!(
        sink.events(),
        vec![
            StatusEvent::Alert { message: NO_CHATS_ALERT.to_string() },
            StatusEvent::Completed,
        ]
    );
}

#[tokio::test]
async fn stop_during_chat_lets_it_finish() {
    let page = FakePage::new(vec![
        FakeChat::named("a", vec![incoming("one")]),
        FakeChat::named("b", vec![incoming("two")]),
        FakeChat::named("c", vec![incoming("three")]),
    ]);
    let mut ctx = RunContext::new(run_config(5));
    let generator = ScriptedGenerator::new(vec![Ok("reply".into()), Ok("reply".into())])
        .stopping(ctx.stop_handle());
    let sink = RecordingSink::default();

    let phase = pilot(page.clone(), generator, sink.clone()).run(&mut ctx).await;

    assert_eq!(phase, RunPhase::Stopped);
    assert_eq!(page.opened(), vec![0]);
    assert_eq!(page.sent(), vec![(0, "reply".to_string())]);
    assert_eq!(ctx.stats(), RunStats { processed: 1, responded: 1, skipped: 0 });
    assert_eq!(sink.events().last(), Some(&StatusEvent::Completed));
}

#[tokio::test]
async fn conversation_window_is_sent_with_roles() {
    let page = FakePage::new(vec![FakeChat::named(
        "eve",
        vec![incoming("m1"), outgoing("m2"), incoming("m3"), outgoing("m4"), incoming("m5")],
    )]);
    let generator = ScriptedGenerator::new(vec![Ok("ok".into())]);

    let mut ctx = RunContext::new(run_config(3));
    pilot(page, generator.clone(), RecordingSink::default())
        .run(&mut ctx)
        .await;

    assert_eq!(
        generator.calls(),
        vec![vec![
            ConversationTurn::user("m3"),
            ConversationTurn::assistant("m4"),
            ConversationTurn::user("m5"),
        ]]
    );
}

#[tokio::test]
async fn chat_without_messages_is_skipped() {
    let page = FakePage::new(vec![FakeChat { name: None, messages: vec![] }]);
    let generator = ScriptedGenerator::new(vec![Ok("unused".into())]);
    let sink = RecordingSink::default();

    let mut ctx = RunContext::new(run_config(5));
    pilot(page, generator.clone(), sink.clone()).run(&mut ctx).await;

    assert_eq!(ctx.stats(), RunStats { processed: 1, responded: 0, skipped: 1 });
    assert!(generator.calls().is_empty());
    assert!(sink.events().contains(&StatusEvent::CurrentChat {
        name: "Chat 1".into(),
        status: "Checking last message...".into(),
    }));
}

#[tokio::test]
async fn sender_policy_decides_what_counts_as_outgoing() {
    // Right-aligned text is outgoing for the broad policy only.
    let right_aligned = {
        let mut node = incoming("sent by me?");
        node.signals.text_align = "right".into();
        node
    };
    let page = FakePage::new(vec![FakeChat::named("fay", vec![right_aligned])]);
    let generator = ScriptedGenerator::new(vec![Ok("answer".into())]);

    let strict = RunOptions {
        sender_policy: SenderPolicy::Strict,
        ..options()
    };
    let mut ctx = RunContext::new(run_config(5));
    Autopilot::new(page.clone(), Box::new(generator.clone()), Arc::new(RecordingSink::default()), strict)
        .run(&mut ctx)
        .await;
    assert_eq!(ctx.stats().responded, 1);

    let mut ctx = RunContext::new(run_config(5));
    pilot(page, generator, RecordingSink::default()).run(&mut ctx).await;
    assert_eq!(ctx.stats().skipped, 1);
}

#[tokio::test]
async fn stats_restart_from_zero_on_each_run() {
    let page = FakePage::new(vec![FakeChat::named("gus", vec![outgoing("bye")])]);
    let pilot = pilot(page, ScriptedGenerator::new(vec![]), RecordingSink::default());

    let mut ctx = RunContext::new(run_config(5));
    pilot.run(&mut ctx).await;
    pilot.run(&mut ctx).await;
    assert_eq!(ctx.stats(), RunStats { processed: 1, responded: 0, skipped: 1 });
}

#[tokio::test]
async fn page_errors_skip_the_chat_and_the_run_goes_on() {
    let page = FakePage::new(vec![
        FakeChat::named("gone", vec![incoming("hello?")]),
        FakeChat::named("broken", vec![incoming("anyone?")]),
        FakeChat::named("fine", vec![incoming("hi")]),
    ])
    .unclickable(0)
    .unreadable(1);
    let generator = ScriptedGenerator::new(vec![Ok("hey!".into())]);
    let sink = RecordingSink::default();

    let mut ctx = RunContext::new(run_config(5));
    let phase = pilot(page.clone(), generator.clone(), sink.clone()).run(&mut ctx).await;

    assert_eq!(phase, RunPhase::Completed);
    assert_eq!(ctx.stats(), RunStats { processed: 3, responded: 1, skipped: 2 });
    assert_eq!(page.sent(), vec![(2, "hey!".to_string())]);
    assert_eq!(generator.calls().len(), 1);
    assert_eq!(stats_events(&sink.events()).len(), 3);
}

#[tokio::test]
async fn missing_input_still_counts_as_responded() {
    let page = FakePage::new(vec![FakeChat::named("hal", vec![incoming("still there?")])])
        .injecting(InjectionOutcome::InputMissing);
    let generator = ScriptedGenerator::new(vec![Ok("yes".into())]);

    let mut ctx = RunContext::new(run_config(5));
    pilot(page, generator, RecordingSink::default()).run(&mut ctx).await;

    assert_eq!(ctx.stats(), RunStats { processed: 1, responded: 1, skipped: 0 });
}

fn three_chats() -> FakePage {
    FakePage::new(vec![
        FakeChat::named("a", vec![incoming("one")]),
        FakeChat::named("b", vec![incoming("two")]),
        FakeChat::named("c", vec![incoming("three")]),
    ])
}

#[tokio::test(start_paused = true)]
async fn delay_is_taken_between_chats_only() {
    let generator = ScriptedGenerator::new(vec![Ok("r".into()), Ok("r".into()), Ok("r".into())]);
    let mut ctx = RunContext::new(RunConfig::new("sk-test", 1000, 5).unwrap());

    let started = Instant::now();
    pilot(three_chats(), generator, RecordingSink::default()).run(&mut ctx).await;
    let elapsed = started.elapsed();

    assert_eq!(ctx.stats().processed, 3);
    assert!(elapsed >= Duration::from_millis(2000), "two gaps expected, took {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3000), "no delay after the last chat, took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn no_delay_once_stop_is_requested() {
    let mut ctx = RunContext::new(RunConfig::new("sk-test", 1000, 5).unwrap());
    let generator = ScriptedGenerator::new(vec![Ok("r".into())]).stopping(ctx.stop_handle());

    let started = Instant::now();
    let phase = pilot(three_chats(), generator, RecordingSink::default()).run(&mut ctx).await;

    assert_eq!(phase, RunPhase::Stopped);
    assert_eq!(ctx.stats().processed, 1);
    assert!(started.elapsed() < Duration::from_millis(1000));
}
