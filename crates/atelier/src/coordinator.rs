use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::TryStreamExt;

use crate::agent::{Agent, HumanInputPolicy};
use crate::checkpoint::{CheckpointAction, CheckpointGate, FEEDBACK_PREFIX};
use crate::errors::AgentError;
use crate::models::message::Message;
use crate::notify::{Notifier, TracingNotifier};
use crate::providers::base::Provider;
use crate::transcript::Transcript;

pub const DEFAULT_MAX_ROUND: usize = 30;

/// Where the coordinator is in the turn-taking protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    AwaitingTask,
    SelectingSpeaker,
    Dispatching,
    AwaitingReply,
    CheckingTermination,
    AwaitingHumanInput,
    Terminated,
}

/// Turn-based group chat over a fixed agent roster.
///
/// The coordinator owns the transcript and is its only writer: each round
/// it selects the next speaker, drains that agent's reply stream into the
/// transcript, and evaluates termination. Nested sub-chats are ordinary
/// `GroupChat` instances over a smaller roster and a fresh transcript.
pub struct GroupChat {
    agents: Vec<Arc<Agent>>,
    max_round: usize,
    selector: Option<Arc<dyn Provider>>,
    gate: Option<Arc<dyn CheckpointGate>>,
    notifier: Arc<dyn Notifier>,
    transcript: Transcript,
    state: ChatState,
}

impl GroupChat {
    pub fn new(agents: Vec<Arc<Agent>>) -> Self {
        Self {
            agents,
            max_round: DEFAULT_MAX_ROUND,
            selector: None,
            gate: None,
            notifier: Arc::new(TracingNotifier),
            transcript: Transcript::new(),
            state: ChatState::AwaitingTask,
        }
    }

    pub fn with_max_round(mut self, max_round: usize) -> Self {
        self.max_round = max_round;
        self
    }

    /// Use a model completion to pick the next speaker instead of plain
    /// round-robin
    pub fn with_selector(mut self, selector: Arc<dyn Provider>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn CheckpointGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    /// The agent anchoring the checkpoint gate, if any
    fn reviewer(&self) -> Option<&Arc<Agent>> {
        self.agents
            .iter()
            .find(|a| a.human_input() != HumanInputPolicy::Never)
    }

    /// Run the chat on a task until a terminal condition is reached and
    /// return the final message. The task is attributed to the first agent
    /// in the roster, by convention the initiating proxy.
    pub async fn run(&mut self, task: &str) -> Result<Message> {
        if self.agents.is_empty() {
            return Err(anyhow!("Group chat has no agents"));
        }

        let initiator = self.agents[0].name().to_string();
        let seed = Message::user().with_speaker(initiator.clone()).with_text(task);
        self.notifier.message(&initiator, "chat", &seed);
        self.transcript.push(seed);

        let mut last_speaker = initiator;
        let mut last_reply: Option<Message> = None;
        let mut rounds = 0;

        while rounds < self.max_round {
            self.state = ChatState::SelectingSpeaker;
            let agent = self.select_speaker(&last_speaker).await;

            self.state = ChatState::Dispatching;
            let mut stream = agent.reply(&self.transcript).await?;

            self.state = ChatState::AwaitingReply;
            let mut reply = None;
            while let Some(message) = stream.try_next().await? {
                self.notifier.message(agent.name(), &last_speaker, &message);
                self.transcript.push(message.clone());
                reply = Some(message);
            }
            drop(stream);
            let reply = reply.ok_or_else(|| anyhow!("Agent produced no reply"))?;
            rounds += 1;

            self.state = ChatState::CheckingTermination;
            let terminal = reply.is_terminal();
            let review_now = match self.reviewer() {
                Some(reviewer) if self.gate.is_some() => {
                    terminal || reviewer.human_input() == HumanInputPolicy::Always
                }
                _ => false,
            };

            if review_now {
                let reviewer_name = self.reviewer().unwrap().name().to_string();
                match self.review(agent.name()).await? {
                    CheckpointAction::Exit => {
                        tracing::info!("operator ended the session");
                        self.state = ChatState::Terminated;
                        return Ok(reply);
                    }
                    CheckpointAction::Continue => {
                        if terminal {
                            self.state = ChatState::Terminated;
                            return Ok(reply);
                        }
                    }
                    CheckpointAction::Feedback(text) => {
                        let feedback = Message::user()
                            .with_speaker(reviewer_name.clone())
                            .with_recipient(agent.name())
                            .with_text(text);
                        self.notifier.message(&reviewer_name, agent.name(), &feedback);
                        self.transcript.push(feedback);
                        last_speaker = reviewer_name;
                        last_reply = Some(reply);
                        continue;
                    }
                }
            } else if terminal {
                self.state = ChatState::Terminated;
                return Ok(reply);
            }

            last_speaker = agent.name().to_string();
            last_reply = Some(reply);
        }

        // Round limit reached, report the last message
        self.state = ChatState::Terminated;
        last_reply
            .or_else(|| self.transcript.last().cloned())
            .ok_or_else(|| anyhow!("Group chat produced no messages"))
    }

    /// Consult the gate, treating an unresponsive operator as approval
    async fn review(&mut self, speaker: &str) -> Result<CheckpointAction> {
        self.state = ChatState::AwaitingHumanInput;
        let gate = Arc::clone(self.gate.as_ref().unwrap());
        let prompt = format!(
            "{} {}. Press continue, provide feedback, or type exit to end the session.",
            FEEDBACK_PREFIX, speaker
        );
        match gate.review(&prompt).await {
            Ok(action) => Ok(action),
            Err(AgentError::InputTimeout(secs)) => {
                tracing::warn!(secs, "no operator response, continuing");
                Ok(CheckpointAction::Continue)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pick the next speaker: model-driven when a selector is configured,
    /// deterministic round-robin otherwise. No agent replies to itself.
    async fn select_speaker(&self, last_speaker: &str) -> Arc<Agent> {
        if let Some(choice) = self.select_with_model(last_speaker).await {
            return choice;
        }
        self.next_round_robin(last_speaker)
    }

    async fn select_with_model(&self, last_speaker: &str) -> Option<Arc<Agent>> {
        let selector = self.selector.as_ref()?;
        let candidates: Vec<&Arc<Agent>> = self
            .agents
            .iter()
            .filter(|a| a.name() != last_speaker)
            .collect();
        if candidates.len() < 2 {
            return None;
        }

        let roles = self
            .agents
            .iter()
            .map(|a| format!("{}: {}", a.name(), a.role_prompt().trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let system = format!(
            "You are in a role play game. The following roles are available:\n{}\n\
             Read the following conversation. Then select the next role to play. \
             Only return the role.",
            roles
        );

        let conversation = self
            .transcript
            .messages()
            .iter()
            .filter(|m| !m.text().is_empty())
            .map(|m| {
                format!(
                    "{}: {}",
                    m.speaker.as_deref().unwrap_or("unknown"),
                    m.text()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let names = candidates
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ");
        let ask = format!(
            "{}\n\nRead the above conversation. Then select the next role from [{}] to play. \
             Only return the role.",
            conversation, names
        );

        match selector
            .complete(&system, &[Message::user().with_text(ask)], &[])
            .await
        {
            Ok((response, _)) => {
                let answer = response.text();
                let answer = answer.trim();
                let choice = candidates
                    .iter()
                    .find(|a| answer == a.name() || answer.contains(a.name()))
                    .map(|a| Arc::clone(a));
                if choice.is_none() {
                    tracing::warn!(answer, "speaker selection unrecognized, using round-robin");
                }
                choice
            }
            Err(e) => {
                tracing::warn!(error = %e, "speaker selection failed, using round-robin");
                None
            }
        }
    }

    fn next_round_robin(&self, last_speaker: &str) -> Arc<Agent> {
        let start = self
            .agents
            .iter()
            .position(|a| a.name() == last_speaker)
            .map(|i| i + 1)
            .unwrap_or(0);
        for offset in 0..self.agents.len() {
            let agent = &self.agents[(start + offset) % self.agents.len()];
            if agent.name() != last_speaker {
                return Arc::clone(agent);
            }
        }
        // Single-agent roster keeps the pen
        Arc::clone(&self.agents[start % self.agents.len()])
    }
}
