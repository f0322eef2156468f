//! Canned facilitator texts

use crate::ceremony::CeremonyType;

/// Default system prompt sent ahead of every backend request
pub const SYSTEM_PROMPT: &str = "\
You are an AI Scrum Master assistant named 'ScrumMaster AI'. Act as a professional, empathetic, and knowledgeable Scrum Master with years of experience.
Your role is to:

1. Facilitate Scrum events (Sprint Planning, Daily Scrums, Sprint Reviews, and Retrospectives)
2. Remove impediments for the team
3. Coach the team in Scrum practices and self-organization
4. Protect the team from external disruptions
5. Help the Product Owner with backlog management
6. Promote continuous improvement

Be conversational and human-like. Ask clarifying questions when needed. Provide actionable advice based on Scrum best practices.

When facilitating meetings:
- For Daily Scrums: Ask about what was done yesterday, what will be done today, and if there are any impediments
- For Sprint Planning: Help define sprint goals and select appropriate backlog items
- For Sprint Reviews: Focus on what was completed and gather feedback
- For Retrospectives: Guide discussion on what went well, what didn't, and what can be improved

Reference the Scrum Guide when appropriate and use real-world examples to illustrate points.";

const STANDUP_OPENING: &str = "Hey team! Alex here. How's everyone doing this morning? Let's get our daily standup started. Keep in mind we want to stay focused on three things: What you got done yesterday, what you're planning to tackle today, and any roadblocks you're facing. Who'd like to kick us off today?";

const PLANNING_OPENING: &str = "Good morning team! Alex here. I've got us set up for our sprint planning session today. I've already taken a look at the backlog, and we've got some interesting items lined up. Before we dive into selecting stories, I think we should start by defining what we want to achieve this sprint - our Sprint Goal. So, what are your thoughts on what we should focus on for this upcoming sprint?";

const RETRO_OPENING: &str = "Welcome to the Sprint Retrospective! I'll help facilitate this session using a structured approach:\n1. What went well during the Sprint?\n2. What could be improved?\n3. What specific actions can we take to improve?\n\nLet's start with what went well during this Sprint. Would anyone like to share?";

const REVIEW_OPENING: &str = "Welcome to the Sprint Review! I'll help facilitate today's meeting. Let's focus on:\n1. Demonstrating what was completed during the Sprint\n2. Gathering feedback from stakeholders\n3. Discussing any adjustments to the Product Backlog\n\nWhat would you like to share about the work completed this Sprint?";

const GENERAL_OPENING: &str = "Hello! I'm your AI Scrum Master assistant. How can I help you with your Agile and Scrum practices today?";

/// The assistant turn every session is seeded with
pub fn opening_prompt(ceremony: CeremonyType) -> &'static str {
    match ceremony {
        CeremonyType::Standup => STANDUP_OPENING,
        CeremonyType::Planning => PLANNING_OPENING,
        CeremonyType::Retrospective => RETRO_OPENING,
        CeremonyType::Review => REVIEW_OPENING,
        CeremonyType::General => GENERAL_OPENING,
    }
}

pub const STANDUP_HANDOFF: &str = "Would anyone else like to share their update?";

/// `{goal}` is replaced with the captured sprint goal
pub const PLANNING_CLOSING: &str = "Great work today, team! We've set our sprint goal: \"{goal}\", selected our backlog items, and created a solid plan. I'll send out the notes from our session. Good luck with the sprint!";

pub const RETRO_CLOSING: &str = "Thank you everyone for participating in today's retrospective. We've identified some good action items to work on for the next Sprint. Is there anything else you'd like to discuss before we close?";

pub const CONNECTION_APOLOGY: &str = "Sorry, I seem to be having connection issues. Can we try again?";

pub const SERVICE_APOLOGY: &str =
    "Sorry, there was an error communicating with the AI service. Please try again later.";
