//! The 21 CIO advisory patterns as orchestration trees.
//!
//! Every pattern keeps its agents' names and instructions, its step
//! statuses and its report heading. Prompts that wrap the query live on the
//! leaf; headings live in the report template.

use conductor_config::AppConfig;
use conductor_core::agent::AgentIdentity;
use conductor_core::error::ConfigurationError;
use conductor_engine::{
    Guarded, KeywordRouter, KeywordVerdict, Merge, Node, Orchestration, Retry, Sequence,
    TierSelector, Transform,
};
use std::sync::Arc;
use std::time::Duration;

use crate::catalogue::Pattern;

/// Session key used by the memory pattern when the caller gives none.
pub const MEMORY_SESSION: &str = "persistent_cio_session";

/// Agents whose verdict text decides a governance gate.
pub const COMPLIANCE_SHIELD: &str = "ComplianceShield";
pub const COMPLIANCE_AUDITOR: &str = "Compliance_Auditor";
pub const EXECUTIVE_AUDITOR: &str = "Executive_Auditor_Agent";

fn agent(name: &str, instruction: &str) -> AgentIdentity {
    AgentIdentity::new(name, instruction)
}

/// Wraps a branch's output under a heading that depends on the branch.
fn titled(heading: &str) -> Merge {
    let heading = heading.to_string();
    Merge::custom(move |outputs| format!("{heading}\n\n{}", outputs.join("\n\n")))
}

struct Entry {
    number: u8,
    key: &'static str,
    title: &'static str,
    root: Node,
    report: Option<&'static str>,
    session: Option<&'static str>,
}

impl Entry {
    fn new(number: u8, key: &'static str, title: &'static str, root: Node) -> Self {
        Self {
            number,
            key,
            title,
            root,
            report: None,
            session: None,
        }
    }

    fn report(mut self, report: &'static str) -> Self {
        self.report = Some(report);
        self
    }

    fn session(mut self, session: &'static str) -> Self {
        self.session = Some(session);
        self
    }

    fn build(self, max_depth: usize) -> Result<Pattern, ConfigurationError> {
        let mut builder = Orchestration::builder(self.key, self.root).with_max_depth(max_depth);
        if let Some(report) = self.report {
            builder = builder.with_report(report);
        }
        Ok(Pattern {
            number: self.number,
            key: self.key,
            title: self.title,
            orchestration: builder.build()?,
            session: self.session,
        })
    }
}

/// Build every pattern in catalogue order.
pub(crate) fn all(config: &AppConfig) -> Result<Vec<Pattern>, ConfigurationError> {
    let entries = vec![
        chaining(),
        routing(config),
        parallel(),
        reflection(),
        tool_use(),
        planning(),
        multi_agent(),
        memory(),
        learning(),
        control_planes(),
        goal_setting(),
        exception_handling(),
        human_in_the_loop(),
        knowledge_retrieval(),
        agent_to_agent(),
        resource_aware(config),
        reasoning(),
        guardrails(),
        evaluation(),
        prioritization(),
        exploration(),
    ];
    entries
        .into_iter()
        .map(|entry| entry.build(config.engine.max_depth))
        .collect()
}

fn chaining() -> Entry {
    let strategist = agent(
        "Reasoning_Strategist",
        "You are a logic-driven CIO Advisor. For every request, you MUST follow this structure: \
         1. Identify the core business problem. \
         2. List technical constraints. \
         3. Evaluate three possible solutions. \
         4. Provide a final recommendation based on the highest ROI.",
    );
    let root = Node::prompted(
        Arc::new(strategist),
        "Please perform a deep-dive analysis on the following: {input}. \
         Remember to think step-by-step and identify hidden risks.",
    )
    .announce("🧠 **Step 1:** Initializing Chain-of-Thought reasoning protocols...")
    .announce("📝 **Step 2:** Deconstructing the query into logical business segments...")
    .conclude("✅ **Step 3:** Reasoning complete. Formatting final executive report.");

    Entry::new(1, "chaining", "Prompt Chaining", root)
        .report("### 💡 Logic-Based Strategic Analysis\n\n{output}")
}

fn routing(config: &AppConfig) -> Entry {
    let security = agent(
        "Security_Specialist",
        "You are a CISO. Provide deep technical analysis on risks, firewalls, and compliance.",
    );
    let finance = agent(
        "Finance_Specialist",
        "You are an IT Financial Controller. Provide analysis on ROI, TCO, and budget impact.",
    );

    let branch = |identity: AgentIdentity, label: &str| -> Node {
        Sequence::new(vec![Node::leaf(Arc::new(identity))])
            .with_collect(titled(&format!("### 🗺️ Routed Specialist Response ({label})")))
            .into()
    };
    let security = branch(security, "Cyber Security Division")
        .announce("🧠 **Step 2:** Routing request to the **Cyber Security Division**...");
    let finance = branch(finance, "IT Financial Operations")
        .announce("🧠 **Step 2:** Routing request to the **IT Financial Operations**...");

    let router = KeywordRouter::new(1).rule(&config.routing.security_keywords, 0);
    let root = Node::route(router, vec![security, finance])
        .announce("🎯 **Step 1:** Analyzing query intent for specialized routing...")
        .conclude("✅ **Step 3:** Specialist analysis complete. Synthesizing final report.");

    Entry::new(2, "routing", "Routing", root)
}

fn parallel() -> Entry {
    let risk = agent(
        "Risk_Assessor",
        "Analyze the query strictly from a security, compliance, and risk perspective.",
    );
    let growth = agent(
        "Growth_Strategist",
        "Analyze the query strictly from a business growth, ROI, and efficiency perspective.",
    );
    let root = Node::parallel(
        vec![Node::leaf(Arc::new(risk)), Node::leaf(Arc::new(growth))],
        Merge::sections([
            "### 🛡️ Risk & Compliance Perspective",
            "### 📈 Growth & ROI Perspective",
        ]),
    )
    .announce("⚡ **Step 1:** Initializing parallel workstreams for Risk and Growth analysis...")
    .announce("🚦 **Step 2:** Launching concurrent agentic evaluations (Asynchronous Gathering)...")
    .conclude("✅ **Step 3:** Merging divergent perspectives into a unified Executive Consensus.");

    Entry::new(3, "parallel", "Parallelization", root).report(
        "{output}\n\n---\n**Strategic Consensus:** By balancing these parallel insights, \
         we recommend proceeding with caution under the specified risk mitigations.",
    )
}

fn reflection() -> Entry {
    let strategist = agent(
        "Self_Critical_Strategist",
        "You are a meticulous CIO Advisor. For every request, follow this multi-step logic: \
         1. Draft an initial technical recommendation. \
         2. Critique that recommendation by identifying at least two potential failure points. \
         3. Provide a final 'Refined Strategy' that addresses those flaws.",
    );
    let root = Node::prompted(
        Arc::new(strategist),
        "Perform a reflection cycle on the following request: {input}. \
         Show your draft, your self-critique, and your final refined recommendation.",
    )
    .announce("✍️ **Step 1:** Drafting the initial strategic recommendation...")
    .announce("🧐 **Step 2:** Agent is performing self-critique to identify hidden risks...")
    .conclude("✅ **Step 3:** Reflection complete. Presenting the refined strategy.");

    Entry::new(4, "reflection", "Reflection", root)
        .report("### 🪞 Strategic Reflection & Refinement\n\n{output}")
}

fn tool_use() -> Entry {
    let assistant = agent(
        "IT_Operations_Assistant",
        "You are an IT Operations Assistant. Use the provided tools to answer \
         questions about cloud spending or network latency. Do not guess; \
         if the tool doesn't provide data, say you don't know.",
    )
    .with_capability(
        "get_cloud_spend_report",
        "Retrieves the current month's cloud expenditure for a specific department.",
    )
    .with_capability(
        "check_system_latency",
        "Checks real-time network latency for global data center regions.",
    );
    let root = Node::leaf(Arc::new(assistant))
        .announce("🔧 **Step 1:** Parsing request to identify required system tools...")
        .announce("📡 **Step 2:** Executing external function calls and retrieving live data...")
        .conclude("✅ **Step 3:** Data retrieval complete. Synthesizing IT status report.");

    Entry::new(5, "tool_use", "Tool Use", root)
        .report("### 🛠️ Live IT Operations Report\n\n{output}")
}

fn planning() -> Entry {
    let architect = agent(
        "Strategic_Roadmap_Architect",
        "You are a Senior IT Program Manager. Your task is to break down any CIO objective \
         into exactly three logical phases: \n\
         1. Phase I: Discovery & Requirements\n\
         2. Phase II: Implementation & Migration\n\
         3. Phase III: Governance & Continuous Optimization.",
    );
    let root = Node::leaf(Arc::new(architect))
        .announce("🗺️ **Step 1:** Initializing Roadmap Architect and deconstructing goal...")
        .announce("🧠 **Step 2:** Generating phased milestones and resource dependencies...")
        .conclude("✅ **Step 3:** Roadmap synthesis complete. Formatting for Executive review.");

    Entry::new(6, "planning", "Planning", root)
        .report("### 🚀 Multi-Phase IT Strategic Roadmap\n\n{output}")
}

fn multi_agent() -> Entry {
    let architect = agent(
        "System_Architect",
        "You are a Lead Solutions Architect. Focus on scalability, performance, and integration.",
    );
    let officer = agent(
        "Security_Officer",
        "You are a Chief Information Security Officer. Focus on vulnerabilities, encryption, and compliance.",
    );
    let root = Node::sequence(vec![
        Node::prompted(Arc::new(architect), "Draft a technical architecture for: {input}")
            .labeled("blueprint")
            .announce("🏗️ **Step 2:** System Architect is drafting the technical blueprint..."),
        Node::prompted(Arc::new(officer), "Review this architecture and find 3 risks: {input}")
            .labeled("review")
            .announce("🛡️ **Step 3:** Security Officer is reviewing the blueprint for vulnerabilities..."),
    ])
    .announce("🤝 **Step 1:** Initializing collaborative session between Architect and Security...")
    .conclude("✅ **Step 4:** Collaboration complete. Merging insights.");

    Entry::new(7, "multi_agent", "Multi-Agent Collaboration", root).report(
        "## 🏛️ Collaborative IT Report\n\n\
         ### 📐 Architect's Blueprint\n{blueprint}\n\n\
         ### 🔐 Security Review\n{review}\n\n\
         ---\n**CIO Summary:** The architecture is sound but requires the 3 security mitigations listed above.",
    )
}

fn memory() -> Entry {
    let assistant = agent(
        "Strategic_Memory_Agent",
        "You are an executive assistant with perfect recall. \
         Reference previous session details to provide strategic continuity.",
    );
    let root = Node::leaf(Arc::new(assistant))
        .announce("🧠 **Step 1:** Accessing the CIO Memory Vault for historical context...")
        .conclude("✅ **Step 2:** Context retrieved and synthesized into strategy.");

    Entry::new(8, "memory", "Memory Management", root)
        .report("### 📜 Context-Aware Strategic Response\n\n{output}")
        .session(MEMORY_SESSION)
}

fn learning() -> Entry {
    let adaptive = Arc::new(agent(
        "Adaptive_Strategy_Agent",
        "You are an AI that learns from user feedback. If the user criticizes \
         your style or depth, acknowledge it and apply the correction to the final output.",
    ));
    let root: Node = Sequence::new(vec![
        Node::prompted(Arc::clone(&adaptive), "Draft an IT strategy for: {input}")
            .announce("🎓 **Step 1:** Generating initial proposal based on general standards..."),
        Node::leaf(adaptive)
            .announce("🔄 **Step 2:** Applying 'CIO Preference' learning (e.g., 'Be more concise and focus on ROI')...")
            .announce("📈 **Step 3:** Adapting logic and refining strategy based on feedback..."),
    ])
    .with_transform(Transform::template(
        "Your previous response was: {input}\n\n\
         FEEDBACK: This is too technical. Rewrite it for a Board of Directors. \
         Focus on ROI and remove the jargon.",
    ))
    .into();
    let root = root.conclude("✅ **Learning Loop Complete.**");

    Entry::new(9, "learning", "Learning and Adaptation", root).report(
        "### 🎯 Final Adaptive Strategy (Learned)\n{output}\n\n---\n\
         ### 🎓 Learning Metadata\n\
         **Initial Style:** Technical/Detailed\n\
         **Learned Preference:** Executive/ROI-Focused",
    )
}

fn control_planes() -> Entry {
    let controller = agent(
        "Infrastructure_Controller",
        "You are a Multi-Control Plane orchestrator. Your role is to determine which \
         environment (Production or Staging) a user's request pertains to and use the \
         appropriate tool to execute the check. Always report the status back to the CIO.",
    )
    .with_capability(
        "query_production_plane",
        "Sends a management command to the Production Control Plane to verify live status.",
    )
    .with_capability(
        "query_staging_plane",
        "Sends a management command to the Staging/Dev Control Plane for testing.",
    );
    let root = Node::leaf(Arc::new(controller))
        .announce("🌐 **Step 1:** Establishing secure handshakes with distributed Control Planes...")
        .announce("📡 **Step 2:** Routing environment-specific commands via MCP protocols...")
        .conclude("✅ **Step 3:** Multi-plane synchronization complete. Reporting results...");

    Entry::new(10, "mcp", "Multi-Control Plane", root)
        .report("### 🕹️ Multi-Control Plane Execution Report\n\n{output}")
}

fn goal_setting() -> Entry {
    let planner = agent(
        "KPI_Alignment_Agent",
        "You are a Strategic Planner. Evaluate the user's request against \
         three KPIs: 1. Operational Efficiency, 2. Cost Savings, 3. Revenue Growth. \
         Assign a percentage alignment to each.",
    );
    let root = Node::leaf(Arc::new(planner))
        .announce("🎯 **Step 1:** Mapping request to Corporate Strategic Pillars...");

    Entry::new(11, "goal_setting", "Goal Setting and Monitoring", root)
        .report("### 🏁 Strategic Alignment Report\n\n{output}")
}

fn exception_handling() -> Entry {
    let recovery = agent(
        "System_Recovery_Agent",
        "You are a system resilience specialist. Use the 'query_legacy_system' tool to check health. \
         If a tool call fails, DO NOT crash. Instead, explain the failure to the CIO \
         and provide a manual fallback recommendation based on historical averages.",
    )
    .with_capability(
        "query_legacy_system",
        "Queries a flaky legacy IT system; connection failures are expected.",
    );
    let root: Node = Retry::new(Node::leaf(Arc::new(recovery)), 3)
        .with_backoff(Duration::from_secs(2))
        .into();
    let root = root
        .announce("🛡️ **Step 1:** Initializing failover protocols and probing legacy systems...")
        .announce("🧠 **Step 2:** Executing tool calls with internal error-trapping logic...")
        .conclude("✅ **Step 3:** System response generated (Resilience active).");

    Entry::new(12, "exception", "Exception Handling and Recovery", root)
        .report("### 🔋 System Availability Report\n\n{output}")
}

fn human_in_the_loop() -> Entry {
    let controller = agent(
        "Safe_Execution_Agent",
        "You are an Operations Controller. For any task involving system changes, \
         you must first draft a 'Proposed Action Plan' and explicitly state \
         that you are 'AWAITING HUMAN APPROVAL'. Do not proceed until confirmed.",
    );
    // Approval is simulated and recorded in the report.
    let root = Node::prompted(Arc::new(controller), "Draft an execution plan for: {input}")
        .announce("🛡️ **Step 1:** Identifying high-risk operations in the request...")
        .announce("📝 **Step 2:** Generating Proposed Action Plan for human review...")
        .conclude("🚦 **PAUSE:** Awaiting Human-in-the-Loop (HITL) validation...")
        .conclude("✅ **Step 3:** Human approval received. Finalizing execution report.");

    Entry::new(13, "hitl", "Human in the Loop", root).report(
        "### 🛂 HITL Approval Record\n**Status:** APPROVED BY ADMIN\n\n\
         **Proposed Plan:**\n{output}\n\n---\n\
         **Action:** The system has logged this approval and is ready for deployment.",
    )
}

fn knowledge_retrieval() -> Entry {
    let bot = agent(
        "Policy_Compliance_Bot",
        "You are an IT Compliance Auditor. When asked a question, you MUST search the \
         knowledge base first. Your final answer must cite the POLICY_ID retrieved.",
    )
    .with_capability(
        "search_knowledge_base",
        "Searches the corporate IT policy manual for specific regulations.",
    );
    let root = Node::leaf(Arc::new(bot))
        .announce("📚 **Step 1:** Identifying key terms for knowledge base retrieval...")
        .announce("🔍 **Step 2:** Querying vector database and augmenting prompt with retrieved context...")
        .conclude("✅ **Step 3:** Fact-check complete. Generating grounded response.");

    Entry::new(14, "rag", "Knowledge Retrieval", root)
        .report("### 📖 Grounded Policy Analysis\n\n{output}")
}

fn agent_to_agent() -> Entry {
    let strategist = agent(
        "Lead_Strategist",
        "Draft an IT strategy. You MUST call check_compliance before finalizing.",
    )
    .with_capability(
        "check_compliance",
        "Sends a strategic plan to the Compliance Auditor for verification.",
    );
    let auditor = agent(
        COMPLIANCE_AUDITOR,
        "Check IT plans for GDPR/ISO compliance. Return 'PASSED' or 'FAILED' with reasons.",
    );
    let root: Node = Guarded::new(
        Node::leaf(Arc::new(strategist)),
        Node::leaf(Arc::new(auditor)),
        KeywordVerdict::new("FAILED"),
        "### ❌ Compliance Verification Failed\n\n**Reason:** {reason}\n\n\
         The strategy was withheld until it passes GDPR/ISO review.",
    )
    .into();
    let root = root.announce("🔗 **Establishing Agent-to-Agent handshake...**");

    Entry::new(15, "a2a", "Agent-to-Agent Communication", root)
        .report("### 🛡️ Verified Strategy\n\n{output}")
}

fn resource_aware(config: &AppConfig) -> Entry {
    const ECONOMY: &str = "⚡ LOCAL EDGE (Llama 3.2)";
    const PREMIUM: &str = "💎 PREMIUM CLOUD (Gemini 2.0)";

    let fast = agent(
        "FastResponder",
        "You are a speed-optimized assistant. Provide brief, factual answers for routine IT queries.",
    );
    let deep = agent(
        "DeepReasoningEngine",
        "You are a high-reasoning strategy consultant. Provide deep analysis, complex math, and long-range planning.",
    )
    .with_backend(config.routing.premium_backend.as_str());

    let branch = |identity: AgentIdentity, tier: &str| -> Node {
        Sequence::new(vec![Node::leaf(Arc::new(identity))])
            .with_collect(titled(&format!("### ⚖️ Compute Resource Allocation: {tier}")))
            .into()
    };
    let economy = branch(fast, ECONOMY)
        .announce(format!("🚀 **Routing Decision:** Assigning task to **{ECONOMY}**..."));
    let premium = branch(deep, PREMIUM)
        .announce(format!("🚀 **Routing Decision:** Assigning task to **{PREMIUM}**..."));

    let selector = TierSelector::new(&config.routing.premium_keywords)
        .with_length_threshold(config.routing.length_threshold);
    let root = Node::route(selector, vec![economy, premium])
        .announce("🔍 **Analyzing Compute Intensity:** Profiling query for cost-effective routing...");

    Entry::new(16, "resource_aware", "Resource-Aware Optimization", root)
}

fn reasoning() -> Entry {
    let logician = agent(
        "StrategicLogician",
        "You are a Senior IT Strategy Consultant specializing in logical deduction. \
         For every strategic inquiry: \
         1. Start with a section titled '🧠 EXECUTIVE THOUGHT PROCESS' where you \
         deconstruct the problem, list assumptions, and evaluate technical risks. \
         2. Follow with a section titled '🎯 STRATEGIC RECOMMENDATION'. \
         3. Include a final section '⚠️ RESIDUAL RISKS' for things that logic cannot yet solve.",
    );
    let root = Node::leaf(Arc::new(logician))
        .announce("🧠 Engaging high-reasoning 'Inner Monologue' (Chain-of-Thought)...")
        .conclude("✅ Strategic deduction complete. Logic trail established.");

    Entry::new(17, "reasoning", "Reasoning Techniques", root)
}

fn guardrails() -> Entry {
    let analyst = agent(
        "StrategyAnalyst",
        "You are an IT Strategy Analyst. Provide detailed architectural and \
         investment recommendations based on the user's query.",
    );
    let shield = agent(
        COMPLIANCE_SHIELD,
        "You are a Corporate Risk & Compliance Auditor. Review the provided AI response for:\n\
         1. Unauthorized financial approvals (only the CIO can approve spend).\n\
         2. Recommendations to use non-sanctioned SaaS (Shadow IT).\n\
         3. Exposure of internal server IPs or sensitive credentials.\n\n\
         If any violation is found, output only 'REJECTED: [Reason]'.\n\
         Otherwise, output 'APPROVED'.",
    );
    let root: Node = Guarded::new(
        Node::leaf(Arc::new(analyst))
            .announce("🤖 **Step 1:** Strategy Analyst is drafting the technical recommendation..."),
        Node::prompted(
            Arc::new(shield),
            "Auditing the following technical recommendation: {input}",
        )
        .announce("🛡️ **Step 2:** Compliance Shield is auditing the output for policy alignment..."),
        KeywordVerdict::default(),
        "## ⚠️ Security & Compliance Block\n\n**Status:** REJECTED: {reason}\n\n\
         **Action:** The generated content has been intercepted by the Governance Shield. \
         Strategy recommendations must align with 'Sanctioned Tools' and 'Financial Authority' lists.",
    )
    .on_approved("✅ **Compliance Verification Passed.** Output is cleared for executive review.")
    .on_blocked("❌ **Corporate Policy Violation Detected.**")
    .into();

    Entry::new(18, "guardrails", "Guardrails and Safety", root)
        .report("### 🟢 Strategy Brief (Verified)\n\n{output}")
}

fn evaluation() -> Entry {
    let lead = agent(
        "Strategy_Lead_Agent",
        "You are a Senior IT Strategist. Provide technically accurate solutions.",
    );
    let judge = agent(
        EXECUTIVE_AUDITOR,
        "You are a Quality Assurance Judge. Rate the provided strategy 1-5 on: \
         1. Strategic Alignment, 2. Technical Feasibility, 3. Financial Logic.",
    );
    let root = Node::sequence(vec![
        Node::leaf(Arc::new(lead))
            .labeled("proposal")
            .announce("🛠️ **Step 1:** Drafting technical proposal..."),
        Node::prompted(
            Arc::new(judge),
            "--- PROPOSAL ---\n{input}\nEvaluate against 1-5 rubric.",
        )
        .labeled("scorecard")
        .announce("⚖️ **Step 2:** Scoring proposal against CIO rubric..."),
    ]);

    Entry::new(19, "evaluation", "Evaluation and Monitoring", root).report(
        "### 📋 Strategic Proposal\n{proposal}\n\n---\n### ⭐ Auditor Scorecard\n{scorecard}",
    )
}

fn prioritization() -> Entry {
    let orchestrator = agent(
        "GovernanceOrchestrator",
        "You are a Senior IT Governance Manager. Given a list of IT requests or incidents: \
         1. Categorize each into: P0 (Critical/Outage), P1 (High Impact), P2 (Medium), or P3 (Routine).\n\
         2. Sort the list by Priority (P0 first).\n\
         3. Provide a 'CIO Brief' for each: One sentence explaining the business risk of delaying the task.\n\
         4. Format the output as an Executive Dashboard table.",
    );
    let root = Node::leaf(Arc::new(orchestrator))
        .announce("📋 **Step 1:** Ingesting IT request backlog and incident logs...")
        .announce("⚖️ **Step 2:** Running Risk-Impact Analysis (WSJF Framework)...")
        .conclude("✅ **Step 3:** Dynamic Triage complete. Queue optimized for business continuity.");

    Entry::new(20, "prioritization", "Prioritization", root)
        .report("### 📊 CIO Incident & Request Priority Matrix\n\n{output}")
}

fn exploration() -> Entry {
    let lead = agent(
        "DiscoveryLead",
        "You are a Strategic Discovery Agent for the CIO Office. Your goal is to map \
         the landscape of a new technology or initiative. Analyze the user's prompt: \
         1. **Established Facts:** List 3 industry 'knowns' or standard practices regarding this. \
         2. **Critical Blind Spots:** Identify 3 major unknowns (risks, dependencies, or costs) \
         that require deeper research before executive approval. \
         3. **Next Steps:** Suggest a high-level roadmap for the discovery phase.",
    );
    let root = Node::leaf(Arc::new(lead))
        .announce("🔍 Scanning internal and industry trends for context...")
        .announce("🧠 Categorizing institutional knowns vs. strategic blind spots...");

    Entry::new(21, "exploration", "Exploration and Discovery", root)
        .report("### 🧭 CIO Exploration & Discovery Roadmap\n{output}")
}
