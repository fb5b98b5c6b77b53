//! Prompt text for the two reasoning calls.

use action_strategies::RecommendationRequest;

/// Most recent prior actions included in a recommendation prompt.
const HISTORY_WINDOW: usize = 10;

pub const DETECTION_SYSTEM_PROMPT: &str = "You inspect screenshots of browser games. \
Find every clickable control that could start or resume play (buttons, links, \
overlays). Respond with a single JSON object: \
{\"candidates\": [{\"label\": string, \"x\": number, \"y\": number, \"confidence\": number}]}. \
x and y are the control's center in screenshot pixels; confidence is between 0 and 1. \
Return an empty list when nothing is clickable.";

pub const RECOMMENDATION_SYSTEM_PROMPT: &str = "You are testing a browser game. \
Given a screenshot, the page HTML and the actions already taken, choose the next \
action that makes progress toward the goal. Respond with a single JSON object: \
{\"action\": \"click\"|\"keypress\"|\"wait\"|\"complete\", \"target\": ..., \
\"reasoning\": string, \"confidence\": number, \"alternatives\": [...]}. \
For click the target is {\"x\": number, \"y\": number}; for keypress a key name such as \
\"Space\" or \"ArrowLeft\"; for wait a duration in milliseconds. Use complete with no \
target once the goal is reached. Alternatives use the same shape without their own \
alternatives, ordered by preference.";

pub fn detection_user_prompt() -> String {
    "Locate the controls that start the game.".to_string()
}

pub fn recommendation_user_prompt(request: &RecommendationRequest) -> String {
    let mut prompt = format!("Goal: {}\n\n", request.goal);

    if request.prior_actions.is_empty() {
        prompt.push_str("Prior actions: none\n\n");
    } else {
        prompt.push_str("Prior actions (oldest first):\n");
        let skip = request.prior_actions.len().saturating_sub(HISTORY_WINDOW);
        for (index, action) in request.prior_actions.iter().enumerate().skip(skip) {
            prompt.push_str(&format!("{}. {}\n", index + 1, action));
        }
        prompt.push('\n');
    }

    prompt.push_str("Page HTML:\n");
    prompt.push_str(&request.html);
    prompt
}
