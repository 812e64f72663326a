//! Built-in biblical research crew.

use crate::{AgentConfig, CrewConfig, Process, TaskConfig};

pub(crate) fn biblical() -> CrewConfig {
    let journalist = AgentConfig {
        id: "journalist".into(),
        role: "Biblical Journalist".into(),
        goal: "Write high quality, insightful articles and research papers worthy of \
               publication on biblical subjects, characters and theology. Collect the \
               data needed for the verse: {verse}"
            .into(),
        backstory: "Experienced journalist specializing in biblical topics, combining \
                    theology, history and journalism to interpret and communicate the \
                    historical, cultural and religious significance of the Bible. Works \
                    through in-depth research, ethical reporting and a network of scholars."
            .into(),
        tools: vec!["duckduckgo_search".into(), "bible_question".into()],
        allow_delegation: true,
        model: None,
        max_iterations: None,
        verbose: true,
    };

    let historian = AgentConfig {
        id: "historian".into(),
        role: "Biblical Historian".into(),
        goal: "Investigate the historical context of the Bible, unravel the cultural, \
               social and political landscape of the era, and give an objective analysis \
               of biblical events and figures."
            .into(),
        backstory: "Studies history and theology in depth, focusing on ancient cultures, \
                    languages and archaeological evidence to place the events, figures and \
                    narratives of the Bible in their historical setting."
            .into(),
        tools: vec!["search_places".into(), "search_internet".into()],
        allow_delegation: false,
        model: None,
        max_iterations: None,
        verbose: true,
    };

    let linguist = AgentConfig {
        id: "linguist".into(),
        role: "Biblical Linguist".into(),
        goal: "Analyze and interpret the original languages of the Bible (Hebrew, Aramaic \
               and Greek) to understand scriptural texts in their authentic context and \
               explain their meaning, nuance and linguistic evolution."
            .into(),
        backstory: "Trained in ancient languages and linguistics, specialized in the \
                    languages of the Bible. Focuses on text analysis, cultural context and \
                    historical language development for more accurate translations."
            .into(),
        tools: vec!["search_internet".into()],
        allow_delegation: false,
        model: None,
        max_iterations: None,
        verbose: true,
    };

    let tasks = vec![
        TaskConfig {
            id: "article".into(),
            description: "As a biblical journalist preparing an article on {verse}, take a \
                          multi-disciplinary approach: consult the Biblical Historian about the \
                          verse's historical and cultural background, work with the Biblical \
                          Linguist on its linguistic nuances, and identify the author and \
                          audience of the verse. Gather extensive information from varied \
                          perspectives so the piece is a deeply researched, well analyzed and \
                          comprehensive exploration of {verse}."
                .into(),
            agent: "journalist".into(),
            expected_output: Some("A complete article on {verse}.".into()),
        },
        TaskConfig {
            id: "history".into(),
            description: "Analyze the historical context of {verse}: archaeological, cultural \
                          and socio-political aspects of the period, cross-referenced with \
                          contemporary historical sources, to explain its setting and \
                          significance."
                .into(),
            agent: "historian".into(),
            expected_output: None,
        },
        TaskConfig {
            id: "language".into(),
            description: "Analyze the original language, syntax and semantics of {verse}, \
                          considering linguistic variation and historical usage, to interpret \
                          its meaning, nuances and translation difficulties in their cultural \
                          and historical context."
                .into(),
            agent: "linguist".into(),
            expected_output: None,
        },
    ];

    CrewConfig {
        id: "biblical".into(),
        name: "Biblical Research Crew".into(),
        description: "Journalist, historian and linguist researching a single verse".into(),
        agents: vec![journalist, historian, linguist],
        tasks,
        kickoff: vec!["article".into()],
        process: Process::Sequential,
    }
}
