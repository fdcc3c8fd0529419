
use serde_json::{json, Value};
use test_utils::{spawn_app, AGENT, OTHER_AGENT, REPORTER, STRANGER};

async fn body(response: reqwest::Response) -> Value {
    response.json().await.unwrap()
}

#[tokio::test]
async fn report_42_scenario_end_to_end() {
    let app = spawn_app().await;

    // Reporter opens the conversation.
    let res = app
        .send_text(REPORTER, 42, "Where should I leave it?", false, None)
        .await;
    assert_eq!(res.status(), 201);
    let sent = body(res).await;
    assert_eq!(sent["success"], true);
    assert_eq!(sent["message"]["reportId"], 42);
    assert_eq!(sent["message"]["sender"], REPORTER);

    // An agent answers before collection.
    let res = app.send_text(AGENT, 42, "Front gate ok?", true, None).await;
    assert_eq!(res.status(), 201);

    // Both messages, oldest first, with pagination metadata.
    let res = app
        .list_messages(REPORTER, 42, "?limit=50&offset=0")
        .await;
    assert_eq!(res.status(), 200);
    let listed = body(res).await;
    let messages = listed["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "Where should I leave it?");
    assert_eq!(messages[1]["content"], "Front gate ok?");
    assert_eq!(listed["pagination"]["total"], 2);
    assert_eq!(listed["pagination"]["hasMore"], false);

    // The agent collects (external event) and keeps messaging.
    let res = app
        .send_text(AGENT, 42, "Picked it up, thanks!", true, Some(AGENT))
        .await;
    assert_eq!(res.status(), 201);

    // A different agent claiming the collected report is shut out.
    let res = app
        .send_text(OTHER_AGENT, 42, "Let me in", true, Some(AGENT))
        .await;
    assert_eq!(res.status(), 403);

    // Reporter and the collecting agent still get through.
    let res = app
        .send_text(REPORTER, 42, "Thank you!", false, Some(AGENT))
        .await;
    assert_eq!(res.status(), 201);
}

#[tokio::test]
async fn acl_pre_collection() {
    let app = spawn_app().await;

    assert_eq!(
        app.send_text(REPORTER, 1, "from reporter", false, None)
            .await
            .status(),
        201
    );
    assert_eq!(
        app.send_text(AGENT, 1, "from some agent", true, None)
            .await
            .status(),
        201
    );
    // Third, non-agent, non-reporter address.
    assert_eq!(
        app.send_text(STRANGER, 1, "let me in", false, None)
            .await
            .status(),
        403
    );
}

#[tokio::test]
async fn sender_must_match_authenticated_address() {
    let app = spawn_app().await;

    let res = app
        .send_message(
            AGENT,
            json!({
                "reportId": 2,
                "sender": REPORTER,
                "content": "spoofed",
                "isFromAgent": false,
                "reporterAddress": REPORTER,
            }),
        )
        .await;
    assert_eq!(res.status(), 403);
}

#[tokio::test]
async fn content_boundaries() {
    let app = spawn_app().await;

    let max = "a".repeat(500);
    assert_eq!(
        app.send_text(REPORTER, 3, &max, false, None).await.status(),
        201
    );

    let too_long = "a".repeat(501);
    assert_eq!(
        app.send_text(REPORTER, 3, &too_long, false, None)
            .await
            .status(),
        400
    );

    assert_eq!(
        app.send_text(REPORTER, 3, "   \t  ", false, None)
            .await
            .status(),
        400
    );
}

#[tokio::test]
async fn malformed_addresses_are_rejected() {
    let app = spawn_app().await;

    // Malformed authenticated address header.
    let res = app.send_text("0x123", 4, "hello", false, None).await;
    assert_eq!(res.status(), 400);

    // Malformed claim field.
    let res = app
        .send_message(
            REPORTER,
            json!({
                "reportId": 4,
                "sender": REPORTER,
                "content": "hello",
                "isFromAgent": false,
                "reporterAddress": "not-an-address",
            }),
        )
        .await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn missing_auth_header_is_rejected() {
    let app = spawn_app().await;

    let res = app
        .client
        .post(format!("{}/messages", app.api_base))
        .json(&json!({
            "reportId": 5,
            "sender": REPORTER,
            "content": "hello",
            "isFromAgent": false,
            "reporterAddress": REPORTER,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn pagination_reproduces_the_conversation_exactly_once() {
    let app = spawn_app().await;

    for i in 0..5 {
        let res = app
            .send_text(REPORTER, 6, &format!("message {}", i), false, None)
            .await;
        assert_eq!(res.status(), 201);
    }

    let mut collected = Vec::new();
    let mut offset = 0;
    loop {
        let res = app
            .list_messages(REPORTER, 6, &format!("?limit=2&offset={}", offset))
            .await;
        let page = body(res).await;
        assert_eq!(page["pagination"]["total"], 5);
        let messages = page["messages"].as_array().unwrap().clone();

        let expect_more = offset + 2 < 5;
        assert_eq!(page["pagination"]["hasMore"], expect_more);

        if messages.is_empty() {
            break;
        }
        collected.extend(
            messages
                .iter()
                .map(|m| m["content"].as_str().unwrap().to_string()),
        );
        offset += 2;
    }

    let expected: Vec<String> = (0..5).map(|i| format!("message {}", i)).collect();
    assert_eq!(collected, expected);
}

#[tokio::test]
async fn empty_report_is_readable_by_anyone() {
    let app = spawn_app().await;

    let res = app.list_messages(STRANGER, 999, "").await;
    assert_eq!(res.status(), 200);
    let listed = body(res).await;
    assert_eq!(listed["messages"].as_array().unwrap().len(), 0);
    assert_eq!(listed["pagination"]["total"], 0);
    assert_eq!(listed["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn list_access_follows_the_first_message_claims() {
    let app = spawn_app().await;

    app.send_text(REPORTER, 7, "anyone there?", false, None).await;

    // A stranger without the agent role is denied.
    assert_eq!(app.list_messages(STRANGER, 7, "").await.status(), 403);
    // Asserting the agent role grants access before collection.
    assert_eq!(
        app.list_messages(STRANGER, 7, "?agent=true").await.status(),
        200
    );
}

#[tokio::test]
async fn list_parameter_validation() {
    let app = spawn_app().await;

    assert_eq!(
        app.list_messages(REPORTER, 8, "?limit=101").await.status(),
        400
    );
    assert_eq!(
        app.list_messages(REPORTER, 8, "?limit=0").await.status(),
        400
    );
    assert_eq!(app.list_messages(REPORTER, 0, "").await.status(), 400);
}

#[tokio::test]
async fn unread_and_mark_read_by_report_are_idempotent() {
    let app = spawn_app().await;

    app.send_text(AGENT, 9, "first", true, None).await;
    app.send_text(AGENT, 9, "second", true, None).await;
    app.send_text(REPORTER, 9, "own message", false, None).await;

    // Unread counts only what others sent.
    let res = app.unread(REPORTER, REPORTER).await;
    assert_eq!(res.status(), 200);
    assert_eq!(body(res).await["unreadCount"], 2);

    // Asking for someone else's count is denied.
    assert_eq!(app.unread(REPORTER, AGENT).await.status(), 403);

    // First mark-as-read modifies; the second is a no-op.
    let res = app.mark_read(REPORTER, json!({"reportId": 9})).await;
    assert_eq!(body(res).await["modifiedCount"], 2);
    let res = app.mark_read(REPORTER, json!({"reportId": 9})).await;
    assert_eq!(body(res).await["modifiedCount"], 0);

    let res = app.unread(REPORTER, REPORTER).await;
    assert_eq!(body(res).await["unreadCount"], 0);
}

#[tokio::test]
async fn mark_read_by_message_ids() {
    let app = spawn_app().await;

    let res = app.send_text(AGENT, 10, "targeted", true, None).await;
    let message_id = body(res).await["message"]["messageId"]
        .as_str()
        .unwrap()
        .to_string();
    app.send_text(AGENT, 10, "left unread", true, None).await;

    let res = app
        .mark_read(REPORTER, json!({"messageIds": [message_id]}))
        .await;
    assert_eq!(body(res).await["modifiedCount"], 1);

    let res = app.unread(REPORTER, REPORTER).await;
    assert_eq!(body(res).await["unreadCount"], 1);
}

#[tokio::test]
async fn mark_read_requires_a_filter() {
    let app = spawn_app().await;
    let res = app.mark_read(REPORTER, json!({})).await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn undeserializable_bodies_are_validation_errors() {
    let app = spawn_app().await;

    let res = app
        .mark_read(REPORTER, json!({"messageIds": ["not-a-uuid"]}))
        .await;
    assert_eq!(res.status(), 400);
    assert_eq!(body(res).await["error_code"], "VALIDATION_ERROR");

    let res = app
        .send_message(
            REPORTER,
            json!({
                "reportId": 1,
                "sender": REPORTER,
                "content": "hello",
                "isFromAgent": "yes",
                "reporterAddress": REPORTER,
            }),
        )
        .await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn since_constrains_listing_and_unread() {
    let app = spawn_app().await;

    app.send_text(AGENT, 13, "for the reporter", true, None).await;

    // A cutoff in the past keeps everything.
    let res = app
        .list_messages(REPORTER, 13, "?since=1970-01-01T00:00:00Z")
        .await;
    assert_eq!(res.status(), 200);
    assert_eq!(body(res).await["pagination"]["total"], 1);

    // A cutoff in the future filters everything out.
    let res = app
        .list_messages(REPORTER, 13, "?since=2999-01-01T00:00:00Z")
        .await;
    let listed = body(res).await;
    assert_eq!(listed["pagination"]["total"], 0);
    assert!(listed["messages"].as_array().unwrap().is_empty());

    // The unread count honors the same cutoff.
    let res = app
        .client
        .get(format!(
            "{}/messages/unread/{}?since=2999-01-01T00:00:00Z",
            app.api_base, REPORTER
        ))
        .header("x-wallet-address", REPORTER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(body(res).await["unreadCount"], 0);

    // An unparseable cutoff is rejected outright.
    let res = app.list_messages(REPORTER, 13, "?since=yesterday").await;
    assert_eq!(res.status(), 400);
}

#[tokio::test]
async fn stats_reflect_sent_received_unread() {
    let app = spawn_app().await;

    app.send_text(REPORTER, 11, "mine", false, None).await;
    app.send_text(AGENT, 11, "theirs", true, None).await;

    let res = app.stats(REPORTER, REPORTER).await;
    assert_eq!(res.status(), 200);
    let stats = body(res).await;
    assert_eq!(stats["stats"]["totalSent"], 1);
    assert_eq!(stats["stats"]["totalReceived"], 1);
    assert_eq!(stats["stats"]["unreadCount"], 1);

    // Someone else's stats are off limits.
    assert_eq!(app.stats(REPORTER, AGENT).await.status(), 403);
}

#[tokio::test]
async fn address_case_is_irrelevant_to_identity() {
    let app = spawn_app().await;

    let mixed = "0xAbCdEf1234567890aBcDeF1234567890AbCdEf12";
    let lower = "0xabcdef1234567890abcdef1234567890abcdef12";

    // Send with a mixed-case spelling of the agent address everywhere.
    let res = app
        .send_message(
            mixed,
            json!({
                "reportId": 12,
                "sender": mixed,
                "content": "case test",
                "isFromAgent": true,
                "reporterAddress": REPORTER,
            }),
        )
        .await;
    assert_eq!(res.status(), 201);
    assert_eq!(body(res).await["message"]["sender"], lower);

    // The reporter sees it as unread; the sender, queried under the
    // canonical spelling, does not count its own message.
    let res = app.unread(REPORTER, REPORTER).await;
    assert_eq!(body(res).await["unreadCount"], 1);
    let res = app.unread(lower, lower).await;
    assert_eq!(body(res).await["unreadCount"], 0);
}
