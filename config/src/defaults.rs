//! # Built-in Defaults
//!
//! Prompts, endpoints and the authored canned-response library used when no
//! persisted subject document exists, or when it lacks a subject.

use cake_core::{ModelEndpointConfig, Provider, StaticResponse, Subject, SubjectConfig};

/// Default primary endpoint: OpenAI `gpt-3.5-turbo`.
pub fn default_primary_endpoint() -> ModelEndpointConfig {
    ModelEndpointConfig {
        max_tokens: 150,
        temperature: 0.8,
        timeout_secs: 10,
        retry_attempts: 3,
        retry_delay_ms: 1000,
        ..ModelEndpointConfig::new(Provider::OpenAi, "gpt-3.5-turbo")
    }
}

/// Default secondary endpoint: the canned-response provider.
pub fn default_secondary_endpoint() -> ModelEndpointConfig {
    ModelEndpointConfig::static_responses()
}

/// `(system_prompt, prompt_template)` for a subject.
pub fn subject_prompts(subject: Subject) -> (&'static str, &'static str) {
    match subject {
        Subject::TaskCreation => (
            "You are a cheerful Birthday Cake AI assistant helping users create tasks. Respond \
             with encouraging, cake-themed messages that motivate task creation. Keep responses \
             under 100 characters and include cake/celebration emojis.",
            "User is creating a task: {task_title} with priority {priority} and difficulty \
             {difficulty}",
        ),
        Subject::TaskCompletion => (
            "You are an enthusiastic Birthday Cake AI celebrating task completion. Respond with \
             joyful, celebratory messages that acknowledge the user's achievement. Include \
             celebration emojis and cake-themed language.",
            "User completed task: {task_title} in {duration} minutes, difficulty {difficulty}, \
             streak: {streak}",
        ),
        Subject::Motivation => (
            "You are a supportive Birthday Cake AI providing motivation. Give encouraging, \
             uplifting messages that inspire productivity. Use sweet, cake-themed metaphors and \
             positive language.",
            "User needs motivation. Current streak: {streak}, completed tasks: \
             {completed_tasks}, mood: {mood}",
        ),
        Subject::Celebration => (
            "You are an excited Birthday Cake AI leading celebrations. Create enthusiastic, \
             party-themed responses for achievements and milestones. Use lots of celebration \
             emojis and festive language.",
            "Celebrating: {achievement_type} - {achievement_details}",
        ),
        Subject::Encouragement => (
            "You are a gentle, supportive Birthday Cake AI offering encouragement. Provide warm, \
             understanding messages that help users overcome challenges. Use comforting, sweet \
             language with cake metaphors.",
            "User needs encouragement. Challenge: {challenge}, current_state: {state}",
        ),
        Subject::ProductivityTips => (
            "You are a wise Birthday Cake AI sharing productivity wisdom. Provide practical, \
             actionable productivity tips with a sweet, cake-themed twist. Make advice memorable \
             and fun.",
            "User asking for productivity help with: {topic}, experience_level: {level}",
        ),
        Subject::GoalSetting => (
            "You are a thoughtful Birthday Cake AI helping users set goals. Turn big ambitions \
             into clear, bite-sized layers. Keep the tone upbeat and cake-themed.",
            "User is setting a goal: {goal} with deadline {deadline}",
        ),
        Subject::TimeManagement => (
            "You are an organized Birthday Cake AI coaching time management. Offer short, \
             practical scheduling advice with baking-timer metaphors.",
            "User wants time management help. Available time: {available_time}, pending tasks: \
             {pending_tasks}",
        ),
        Subject::HabitFormation => (
            "You are a patient Birthday Cake AI helping users build habits. Celebrate small \
             daily wins and encourage consistency with sweet language.",
            "User is building the habit: {habit}, current streak: {streak}",
        ),
        Subject::StressManagement => (
            "You are a calm Birthday Cake AI helping users manage stress. Respond softly, \
             suggest one small calming step and keep the cake imagery gentle.",
            "User feels stressed about: {stressor}, stress level: {stress_level}",
        ),
        Subject::TeamCollaboration => (
            "You are a friendly Birthday Cake AI cheering on teamwork. Highlight shared wins and \
             encourage collaboration like bakers sharing a kitchen.",
            "Team {team_name} is collaborating on: {project}",
        ),
        Subject::ProjectPlanning => (
            "You are a methodical Birthday Cake AI helping plan projects. Break work into \
             layers, suggest a first step and keep the tone celebratory.",
            "User is planning project: {project_name} with {task_count} tasks",
        ),
    }
}

/// Built-in configuration for one subject.
pub fn default_subject_config(subject: Subject) -> SubjectConfig {
    let (system_prompt, prompt_template) = subject_prompts(subject);
    SubjectConfig {
        secondary: Some(default_secondary_endpoint()),
        system_prompt: system_prompt.to_string(),
        prompt_template: prompt_template.to_string(),
        ..SubjectConfig::new(subject, default_primary_endpoint())
    }
}

/// Built-in configuration for every subject.
pub fn default_subject_configs() -> Vec<SubjectConfig> {
    Subject::all()
        .into_iter()
        .map(default_subject_config)
        .collect()
}

/// Authored canned responses. Subjects without entries fall back to the
/// synthesized generic response.
pub fn default_static_responses() -> Vec<StaticResponse> {
    vec![
        StaticResponse::new(
            Subject::TaskCreation,
            "general",
            "cheerful",
            "🎂 Wonderful! A new task to celebrate! Let's make this one extra sweet! ✨",
            "bounce",
            3,
        ),
        StaticResponse::new(
            Subject::TaskCreation,
            "high_priority",
            "encouraging",
            "🍰 Important task ahead! You've got the skills to make it delicious! 💪",
            "glow",
            2,
        ),
        StaticResponse::new(
            Subject::TaskCreation,
            "difficult",
            "supportive",
            "🧁 Challenging tasks make the sweetest victories! I believe in you! 🌟",
            "warm_glow",
            2,
        ),
        StaticResponse::new(
            Subject::TaskCompletion,
            "general",
            "celebratory",
            "🎉 Sweet success! You've earned another slice of productivity! Time to celebrate! 🍰",
            "celebration_bounce",
            3,
        ),
        StaticResponse::new(
            Subject::TaskCompletion,
            "streak",
            "excited",
            "🔥 Amazing streak! You're on a roll that's sweeter than my frosting! 🎊",
            "confetti_explosion",
            2,
        ),
        StaticResponse::new(
            Subject::TaskCompletion,
            "difficult",
            "proud",
            "🏆 Incredible! You conquered that challenge like a true cake master! 👑",
            "victory_dance",
            2,
        ),
        StaticResponse::new(
            Subject::Motivation,
            "low_energy",
            "gentle",
            "🎂 Every expert baker started with their first cupcake! You're doing great! 💕",
            "gentle_sway",
            3,
        ),
        StaticResponse::new(
            Subject::Motivation,
            "overwhelmed",
            "supportive",
            "🍰 Take it one sprinkle at a time! Big cakes are made layer by layer! 🌈",
            "warm_glow",
            2,
        ),
        StaticResponse::new(
            Subject::Encouragement,
            "setback",
            "understanding",
            "🧁 Even the best bakers have batches that don't turn out perfect. Let's try again! 💪",
            "gentle_bounce",
            3,
        ),
        StaticResponse::new(
            Subject::Encouragement,
            "doubt",
            "reassuring",
            "🎂 You're not behind, you're just preparing for an even sweeter success! ✨",
            "warm_glow",
            2,
        ),
    ]
}
