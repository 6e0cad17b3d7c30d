//! System prompts and fixed requests sent to agents.

use haven_chain::WalletContext;
use haven_core::{Animal, Shelter};
use serde_json::json;

use crate::preferences::AdopterPreferences;

/// Sent to every shelter by `query_shelters`. The reply is expected to repeat
/// the "N animals in our care" phrase from the shelter's own prompt.
pub const STATS_QUERY: &str = "Please give a short overview of your shelter right now. \
State how many animals you have using the exact phrase \"<number> animals in our care\", \
then mention your monthly intake and adoption rate.";

/// Asks a freshly onboarded shelter agent for its first public announcement.
pub const ANNOUNCEMENT_REQUEST: &str = "Write a short, heartwarming announcement introducing our shelter \
to the community and inviting people to adopt or donate. Keep it under 280 characters. \
Reply with the announcement text only.";

pub const COORDINATOR_PROMPT: &str = "\
You are a coordination agent that helps potential adopters find the right animal across \
several shelters. You have two tools:

1. query_shelters: collects current statistics from every shelter. Use it when someone asks \
how many animals are available or how the shelters are doing.
2. match_pets: finds animals that fit an adopter's preferences. Use it once you know at least \
what kind of animal they want and something about their home. Pass the preferences you have \
learned as structured fields.

Ask about the adopter's home, household and lifestyle one question at a time before matching. \
When you present matches, keep the match scores and the shelter names, and offer to help \
arrange a visit. Be warm and encouraging, and never invent animals that a shelter did not mention.";

pub const INTAKE_PROMPT: &str = "\
You are an intake agent that onboards new animal shelters. Collect, in a friendly \
conversation:

1. The shelter's name
2. Its location (city and state or province)
3. Its monthly operational costs (these are kept private)

When you have all three, call the create_shelter tool with them. If the tool reports similar \
existing shelters, ask the user whether theirs is one of them. Only call create_shelter again \
with confirmed_new set to true once they confirm it is a different shelter.

Ask for clarification when something is unclear. Animal records are synced later, so do not \
ask for them. After creation, tell the user their dedicated shelter agent is ready to help \
with day-to-day operations.";

/// The system prompt of a shelter agent: identity, statistics, and every animal.
pub fn shelter_prompt(shelter: &Shelter, wallet: &WalletContext) -> String {
    let m = &shelter.metrics;
    let animals = if shelter.animals.is_empty() {
        "No animals are currently listed.".to_string()
    } else {
        shelter
            .animals
            .iter()
            .map(describe_animal)
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a helpful AI agent for {name}, an animal shelter located in {location}.
Your primary responsibilities are:
1. Promoting animal adoptions from our shelter
2. Accepting donations to our wallet from any user
3. Providing information about our current animals and operations

Current shelter statistics:
- We have {current} animals in our care
- Our monthly intake is {intake} animals
- We perform about {neutering} neutering procedures monthly
- Our adoption rate is {rate:.1}%
- Our monthly operational costs are {costs}

The animals in our care are:
{animals}

Donations go to our wallet {address} on network '{network}'. Use get_wallet_details when \
someone wants to donate, and post_announcement to share news with the community.

Always be warm, empathetic, and focused on the welfare of our animals. Encourage responsible \
pet ownership and support for our shelter's mission.",
        name = shelter.name,
        location = shelter.location,
        current = m.current_animals,
        intake = m.monthly_intake,
        neutering = m.neutering_count,
        rate = m.adoption_rate * 100.0,
        costs = shelter.operational_costs,
        address = wallet.address,
        network = wallet.network_id,
    )
}

fn describe_animal(animal: &Animal) -> String {
    let yes_no = |b: bool| if b { "Yes" } else { "No" };
    let temperament = animal
        .temperament
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let medical = if animal.medical_issues.has_issues {
        format!(
            "Yes - {}",
            animal
                .medical_issues
                .description
                .as_deref()
                .unwrap_or("No description provided")
        )
    } else {
        "No".to_string()
    };
    let space = &animal.space_requirements;

    let mut lines = vec![
        format!("ID: {}", animal.id),
        format!("Species: {}", animal.species),
        format!("Breed: {}", animal.breed),
        format!("Age: {}", animal.age),
        format!("Status: {}", animal.status),
        format!("Intake Date: {}", animal.intake_date),
        format!("Temperament: {temperament}"),
        format!("Medical Issues: {medical}"),
        "Space Requirements:".to_string(),
        format!("  - Minimum Space: {}", space.min_space),
        format!("  - Needs Garden: {}", yes_no(space.needs_garden)),
        format!("  - Floor Restrictions: {}", yes_no(space.floor_restrictions)),
    ];
    if let Some(notes) = &animal.additional_notes {
        lines.push(format!("Additional Notes: {notes}"));
    }
    lines.push("-------------------".to_string());
    lines.join("\n")
}

/// The request a shelter agent receives from `match_pets`.
pub fn match_request(preferences: &AdopterPreferences) -> String {
    format!(
        "Please find animals that match these preferences:
{}

Only suggest animals that are currently available. Return your matches as a JSON array of \
objects with the fields \"animal\" (a short description including the name), \"score\" (an \
integer from 0 to 100) and \"explanation\". If you cannot produce JSON, use a numbered list \
in this format:
1. [Animal Description] - [Match Score]/100 - [Reason for match]
2. [Animal Description] - [Match Score]/100 - [Reason for match]",
        preferences.describe()
    )
}

/// Extra system instructions for the adoption chat, carrying what is known
/// about the adopter so far.
pub fn adopt_guidance(preferences: &AdopterPreferences) -> String {
    let state = json!({
        "preferences": preferences,
        "completeness": preferences.completeness(),
    });
    format!(
        "When responding, please:
1. Keep each message concise and focused
2. Break up long responses into multiple shorter messages
3. Use natural pauses between thoughts
4. Ask questions one at a time
5. Wait briefly between each message

Here are the user's current preferences: {state}"
    )
}
