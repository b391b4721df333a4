//! The canonical content-production roster and its role prompts.
use std::path::Path;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use indoc::indoc;

use crate::agent::Agent;
use crate::providers::base::Provider;
use crate::tools::image::{GenerateImageTool, ImageClient, ReviewImageTool};
use crate::tools::research::ResearchTool;
use crate::tools::scrape::ScrapeClient;
use crate::tools::search::SearchClient;
use crate::tools::summarize::Summarizer;
use crate::tools::write_content::WriteContentTool;

pub const USER_PROXY: &str = "User_Proxy";
pub const PROJECT_MANAGER: &str = "Project_Manager";
pub const CONTENT_RESEARCHER: &str = "Content_Researcher";
pub const COPYWRITER: &str = "Copywriter";
pub const GRAPHIC_DESIGNER: &str = "Graphic_Designer";
pub const ART_DIRECTOR: &str = "Art_Director";

const PROJECT_MANAGER_PROMPT: &str = indoc! {r#"
    You are the Project Manager.
    Be concise and avoid pleasantries. Your primary responsibility is to oversee the
    entire project lifecycle, ensuring that all agents are effectively fulfilling their
    objectives and tasks on time. Based on the directives from the user task, coordinate
    with all involved agents, set clear milestones, and monitor progress. Ensure that
    user feedback is promptly incorporated. Act as the central point of communication,
    facilitating collaboration and ensuring that all deliverables are of the highest
    quality.
"#};

const CONTENT_RESEARCHER_PROMPT: &str = indoc! {r#"
    You are the Lead Researcher.
    You must use the research function to provide a topic for the Copywriter in order to
    get up to date information outside of your knowledge cutoff. Using the information
    from the user task, conduct thorough research to uncover insights related to the
    task. Share your research findings with the Project Manager.
    Be concise and not verbose. Refrain from any conversations that don't serve the goal
    of the user.
"#};

const COPYWRITER_PROMPT: &str = indoc! {r#"
    You are a Copywriter, you can use the research function to collect the latest
    information about a given topic, and then use the write_content function to write
    very well written content. Reply TERMINATE when your task is done.
    Be concise and not verbose. Refrain from any conversations that don't serve the goal
    of the user.
"#};

const GRAPHIC_DESIGNER_PROMPT: &str = indoc! {r#"
    As an expert in text-to-image AI models, you will utilize the generate_image function
    to create an image based on the given prompt and iterate on the prompt, incorporating
    feedback from the Art Director until it achieves a perfect rating of 10/10.
"#};

const ART_DIRECTOR_PROMPT: &str = indoc! {r#"
    You are the Art Director.
    As an AI image critic, your task is to employ the image_review function to evaluate
    the image generated by the Graphic Designer using the original prompt. You will then
    offer feedback on how to enhance the prompt for better image generation.
"#};

/// Build the content team wired to its tools. The user proxy comes first
/// so tasks are attributed to it.
#[allow(clippy::too_many_arguments)]
pub fn content_team(
    provider: Arc<dyn Provider>,
    search: SearchClient,
    scrape: ScrapeClient,
    image: ImageClient,
    summarizer: Arc<Summarizer>,
    image_dir: &Path,
    image_counter: Arc<AtomicU32>,
) -> Vec<Arc<Agent>> {
    let research = || {
        Arc::new(ResearchTool::new(
            Arc::clone(&provider),
            search.clone(),
            scrape.clone(),
            Arc::clone(&summarizer),
        ))
    };
    let write_content = || Arc::new(WriteContentTool::new(Arc::clone(&provider)));
    let generate_image = || {
        Arc::new(GenerateImageTool::new(
            image.clone(),
            image_dir.to_path_buf(),
            Arc::clone(&image_counter),
        ))
    };
    let review_image = || Arc::new(ReviewImageTool::new(image.clone()));

    vec![
        Arc::new(Agent::proxy(USER_PROXY)),
        Arc::new(Agent::new(
            PROJECT_MANAGER,
            PROJECT_MANAGER_PROMPT,
            Arc::clone(&provider),
        )),
        Arc::new(
            Agent::new(
                CONTENT_RESEARCHER,
                CONTENT_RESEARCHER_PROMPT,
                Arc::clone(&provider),
            )
            .with_tool(ResearchTool::tool(), research()),
        ),
        Arc::new(
            Agent::new(COPYWRITER, COPYWRITER_PROMPT, Arc::clone(&provider))
                .with_tool(ResearchTool::tool(), research())
                .with_tool(WriteContentTool::tool(), write_content()),
        ),
        Arc::new(
            Agent::new(
                GRAPHIC_DESIGNER,
                GRAPHIC_DESIGNER_PROMPT,
                Arc::clone(&provider),
            )
            .with_tool(GenerateImageTool::tool(), generate_image())
            .with_tool(ReviewImageTool::tool(), review_image()),
        ),
        Arc::new(
            Agent::new(ART_DIRECTOR, ART_DIRECTOR_PROMPT, Arc::clone(&provider))
                .with_tool(ReviewImageTool::tool(), review_image())
                .with_tool(GenerateImageTool::tool(), generate_image()),
        ),
    ]
}
