// Integration tests for the conversation model
//
// Transcript ordering rules, activity prompts and the completion prompt
// helpers.

use anyhow::Result;
use moshi_call::adapters::prompt::{clean_completion, completion_prompt};
use moshi_call::conversation::{
    Activity, ActivityType, Character, Criterion, Goal, LessonPlan, Message, Role, Transcript,
    Voice,
};
use moshi_call::error::TranscriptError;

#[test]
fn test_transcript_enforces_alternation() -> Result<()> {
    let mut transcript = Transcript::new(ActivityType::Unstructured, "en-US");
    assert_eq!(transcript.expected_role(), Role::Usr);

    let err = transcript.push(Message::assistant("hi")).unwrap_err();
    assert_eq!(
        err,
        TranscriptError::OutOfOrder {
            expected: Role::Usr,
            got: Role::Ast
        }
    );

    transcript.push(Message::user("hello"))?;
    assert!(transcript.push(Message::user("hello again")).is_err());
    transcript.push(Message::assistant("hi there"))?;

    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.turns(), 1);
    assert_eq!(transcript.latest(Role::Usr).map(|m| m.body.as_str()), Some("hello"));
    Ok(())
}

#[test]
fn test_transcript_rejects_system_messages() {
    let mut transcript = Transcript::new(ActivityType::Lesson, "fr-FR");
    assert_eq!(
        transcript.push(Message::system("be nice")).unwrap_err(),
        TranscriptError::SystemMessage
    );
    assert!(transcript.is_empty());
}

#[test]
fn test_transcript_json_shape() -> Result<()> {
    let mut transcript = Transcript::new(ActivityType::Unstructured, "en-US");
    transcript.push(Message::user("hello"))?;

    let json = serde_json::to_value(&transcript)?;
    assert_eq!(json["activity"], "unstructured");
    assert_eq!(json["messages"][0]["role"], "usr");
    assert!(json["messages"][0].get("audio").is_none());

    let back: Transcript = serde_json::from_value(json)?;
    assert_eq!(back.messages(), transcript.messages());
    Ok(())
}

#[test]
fn test_unstructured_prompt_is_character_prompt() {
    let activity = Activity::Unstructured {
        character_prompt: "You are a barista.".to_string(),
    };
    let prompt = activity.base_prompt();
    assert_eq!(prompt.len(), 1);
    assert_eq!(prompt[0].role, Role::Sys);
    assert_eq!(prompt[0].body, "You are a barista.");
}

#[test]
fn test_lesson_prompt_layout() {
    let plan = LessonPlan {
        title: "At the market".to_string(),
        goals: vec![
            Goal {
                title: "Greet".to_string(),
                criteria: vec![Criterion {
                    body: "Says hello".to_string(),
                    points: 1,
                }],
            },
            Goal {
                title: "Buy apples".to_string(),
                criteria: vec![],
            },
        ],
        vocabulary: vec!["pomme".to_string()],
        user_prompt: "You want apples.".to_string(),
        character_prompt: "You sell fruit.".to_string(),
    };
    let activity = Activity::Lesson(plan);
    assert_eq!(activity.kind(), ActivityType::Lesson);

    let prompt = activity.base_prompt();
    assert_eq!(prompt.len(), 5);
    assert!(prompt.iter().all(|m| m.role == Role::Sys));
    assert!(prompt[0].body.starts_with("goal 0: {"));
    assert!(prompt[1].body.starts_with("goal 1: {"));
    assert_eq!(prompt[2].body, "vocabulary: [\"pomme\"]");
    assert_eq!(prompt[3].body, "You want apples.");
    assert_eq!(prompt[4].body, "You sell fruit.");
}

#[test]
fn test_activity_type_parsing() {
    assert_eq!("lesson".parse::<ActivityType>(), Ok(ActivityType::Lesson));
    assert_eq!(
        "unstructured".parse::<ActivityType>(),
        Ok(ActivityType::Unstructured)
    );
    assert!("quiz".parse::<ActivityType>().is_err());
}

#[test]
fn test_character_name_follows_voice_language() {
    assert_eq!(Character::new(Voice::new("en-US-Standard-C", "en-US")).name, "Courtney");
    assert_eq!(Character::new(Voice::new("ja-JP-Standard-A", "ja-JP")).name, "千尋");
    assert_eq!(Character::new(Voice::new("xx", "pt-BR")).name, "Moshi");
}

#[test]
fn test_completion_prompt_flattens_history() {
    let messages = vec![
        Message::system("You sell fruit."),
        Message::user("hello"),
        Message::assistant("hi, what would you like?"),
        Message::user("apples"),
    ];
    assert_eq!(
        completion_prompt(&messages),
        "You sell fruit.\n1: hello\n2: hi, what would you like?\n1: apples\n2:"
    );

    assert_eq!(clean_completion("2: Three, please.\n1: ok"), "Three, please.");
}
