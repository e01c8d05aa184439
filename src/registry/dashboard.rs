//! Server-rendered HTML dashboard.
//!
//! The page lists agents (most recently seen first) and the relay history,
//! and offers two modals: one showing an agent's card, one posting a
//! message to `/send-message`. It reloads itself every 10 seconds while no
//! modal is open.

use std::fmt::Write as _;

use super::{AgentRecord, HistoryEntry};

const DESCRIPTION_WIDTH: usize = 40;
const MESSAGE_WIDTH: usize = 50;
const RESPONSE_WIDTH: usize = 80;

/// Escape text for use in HTML content and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Cut `input` to `width` characters, appending `...` when shortened.
pub fn truncate(input: &str, width: usize) -> String {
    if input.chars().count() <= width {
        return input.to_string();
    }
    let mut cut: String = input.chars().take(width).collect();
    cut.push_str("...");
    cut
}

fn agent_rows(agents: &[AgentRecord]) -> String {
    if agents.is_empty() {
        return r#"<tr><td colspan="6" class="empty">No agents registered yet. Run an agent with registration enabled!</td></tr>"#
            .to_string();
    }

    let mut sorted: Vec<&AgentRecord> = agents.iter().collect();
    sorted.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));

    let mut rows = String::new();
    for agent in sorted {
        let version = if agent.version.is_empty() {
            String::new()
        } else {
            format!(r#" <span class="version">v{}</span>"#, escape(&agent.version))
        };
        let skills = if agent.skills.is_empty() {
            "-".to_string()
        } else {
            escape(&agent.skills.join(", "))
        };
        let url = escape(&agent.url);
        let name = escape(&agent.name);

        let _ = write!(
            rows,
            r#"<tr>
  <td class="name">{name}{version}</td>
  <td class="author">{author}</td>
  <td class="desc">{desc}</td>
  <td class="url"><a href="{url}" target="_blank">{url}</a></td>
  <td class="skills">{skills}</td>
  <td class="actions">
    <button class="card-btn" data-url="{url}" onclick="showCard(this.dataset.url)">Card</button>
    <button class="chat-btn" data-url="{url}" data-name="{name}" onclick="openChat(this.dataset.url, this.dataset.name)">Chat</button>
  </td>
</tr>
"#,
            author = escape(&agent.author),
            desc = escape(&truncate(&agent.description, DESCRIPTION_WIDTH)),
        );
    }
    rows
}

fn history_rows(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return r#"<tr><td colspan="4" class="empty">No messages yet. Send a message to an agent!</td></tr>"#
            .to_string();
    }

    let mut rows = String::new();
    for entry in history {
        let class = if entry.is_error { "error" } else { "" };
        let _ = write!(
            rows,
            r#"<tr class="{class}">
  <td class="timestamp">{ts}</td>
  <td class="name">{agent}</td>
  <td class="msg">{msg}</td>
  <td class="resp">{resp}</td>
</tr>
"#,
            ts = entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            agent = escape(&entry.agent_name),
            msg = escape(&truncate(&entry.message, MESSAGE_WIDTH)),
            resp = escape(&truncate(&entry.response, RESPONSE_WIDTH)),
        );
    }
    rows
}

/// Render the full dashboard page.
pub fn render(agents: &[AgentRecord], history: &[HistoryEntry], history_capacity: usize) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>A2A Agent Registry</title>
<style>
  body {{ font-family: system-ui, sans-serif; background: #1a1a2e; color: #eee; margin: 0; padding: 30px; }}
  .container {{ max-width: 1200px; margin: 0 auto; }}
  h1, h2 {{ color: #00d4ff; }}
  .subtitle {{ color: #888; }}
  .count {{ background: #00d4ff; color: #1a1a2e; display: inline-block; padding: 4px 12px; border-radius: 12px; font-weight: bold; }}
  table {{ width: 100%; border-collapse: collapse; margin-top: 15px; background: #16213e; }}
  th, td {{ padding: 10px; text-align: left; border-bottom: 1px solid #0f3460; }}
  th {{ background: #0f3460; color: #00d4ff; }}
  .version {{ background: #e94560; border-radius: 8px; padding: 1px 6px; font-size: 0.75em; }}
  .empty {{ text-align: center; color: #888; font-style: italic; }}
  tr.error td.resp {{ color: #e94560; }}
  a {{ color: #00d4ff; }}
  button {{ background: #0f3460; color: #eee; border: 1px solid #00d4ff; border-radius: 4px; padding: 4px 10px; cursor: pointer; }}
  .modal {{ display: none; position: fixed; inset: 0; background: rgba(0,0,0,0.7); align-items: center; justify-content: center; }}
  .modal.active {{ display: flex; }}
  .modal-content {{ background: #16213e; padding: 20px; border-radius: 8px; width: 700px; max-height: 80vh; overflow: auto; }}
  .modal-header {{ display: flex; justify-content: space-between; align-items: center; }}
  pre {{ white-space: pre-wrap; background: #0f0f1e; padding: 10px; }}
  textarea {{ width: 100%; min-height: 80px; background: #0f0f1e; color: #eee; }}
  .footer {{ color: #666; font-size: 0.85em; margin-top: 20px; }}
</style>
</head>
<body>
<div class="container">
  <h1>A2A Agent Registry</h1>
  <p class="subtitle">Agent-to-Agent lab directory</p>
  <div class="count">{agent_count} agent(s) online</div>
  <table>
    <thead><tr><th>Name</th><th>Author</th><th>Description</th><th>URL</th><th>Skills</th><th>Actions</th></tr></thead>
    <tbody>
{agent_rows}
    </tbody>
  </table>
  <p class="footer">Auto-refreshes every 10 seconds | <a href="/agents">JSON</a> | <a href="/.well-known/agents/index.json">index.json</a></p>

  <h2>Message History</h2>
  <p class="subtitle">Last {history_capacity} messages</p>
  <table>
    <thead><tr><th>Time</th><th>Agent</th><th>Message</th><th>Response</th></tr></thead>
    <tbody>
{history_rows}
    </tbody>
  </table>
</div>

<div class="modal" id="cardModal">
  <div class="modal-content">
    <div class="modal-header"><h2>Agent Card</h2><button onclick="closeModal('cardModal')">&times;</button></div>
    <pre id="cardContent"></pre>
  </div>
</div>

<div class="modal" id="chatModal">
  <div class="modal-content">
    <div class="modal-header"><h2>Send Message to <span id="chatAgentName"></span></h2><button onclick="closeModal('chatModal')">&times;</button></div>
    <textarea id="chatInput" placeholder="Type your message..."></textarea>
    <button id="chatSend" onclick="sendChat()">Send</button>
    <pre id="chatResponse"></pre>
  </div>
</div>

<script>
  let refreshTimer = setInterval(() => location.reload(), 10000);
  let chatUrl = null;

  function pauseRefresh() {{ clearInterval(refreshTimer); refreshTimer = null; }}
  function resumeRefresh() {{ if (!refreshTimer) refreshTimer = setInterval(() => location.reload(), 10000); }}
  function closeModal(id) {{ document.getElementById(id).classList.remove('active'); resumeRefresh(); }}

  async function showCard(url) {{
    pauseRefresh();
    const res = await fetch('/agents/' + encodeURIComponent(url) + '/card');
    const body = await res.json();
    document.getElementById('cardContent').textContent = JSON.stringify(body, null, 2);
    document.getElementById('cardModal').classList.add('active');
  }}

  function openChat(url, name) {{
    pauseRefresh();
    chatUrl = url;
    document.getElementById('chatAgentName').textContent = name;
    document.getElementById('chatInput').value = '';
    document.getElementById('chatResponse').textContent = '';
    document.getElementById('chatModal').classList.add('active');
  }}

  async function sendChat() {{
    const message = document.getElementById('chatInput').value.trim();
    if (!message) return;
    const out = document.getElementById('chatResponse');
    const button = document.getElementById('chatSend');
    button.disabled = true;
    out.textContent = 'Waiting for response...';
    try {{
      const res = await fetch('/send-message', {{
        method: 'POST',
        headers: {{ 'Content-Type': 'application/json' }},
        body: JSON.stringify({{ agent_url: chatUrl, message }})
      }});
      const body = await res.json();
      out.textContent = res.ok ? body.response : ('Error: ' + body.detail);
    }} catch (e) {{
      out.textContent = 'Error: ' + e;
    }} finally {{
      button.disabled = false;
    }}
  }}

  document.addEventListener('keydown', (e) => {{ if (e.key === 'Escape') closeModal('cardModal'); }});
</script>
</body>
</html>
"#,
        agent_count = agents.len(),
        agent_rows = agent_rows(agents),
        history_rows = history_rows(history),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn agent(name: &str, url: &str, seen_secs: i64) -> AgentRecord {
        let at = Utc.timestamp_opt(1_700_000_000 + seen_secs, 0).unwrap();
        AgentRecord {
            name: name.into(),
            description: "An agent that does a great many useful things for people".into(),
            url: url.into(),
            card_url: format!("{url}/.well-known/agent-card.json"),
            skills: vec![],
            author: String::new(),
            author_url: String::new(),
            version: "1.0.0".into(),
            card: json!({}),
            registered_at: at,
            last_seen: at,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 40), "short");
        assert_eq!(truncate("ååååå", 3), "ååå...");
    }

    #[test]
    fn test_empty_states() {
        let html = render(&[], &[], 20);
        assert!(html.contains("No agents registered yet"));
        assert!(html.contains("No messages yet"));
        assert!(html.contains("0 agent(s) online"));
    }

    #[test]
    fn test_agents_sorted_by_last_seen_and_escaped() {
        let agents = vec![
            agent("Old <b>agent</b>", "http://old", 0),
            agent("Fresh agent", "http://fresh", 60),
        ];
        let html = render(&agents, &[], 20);

        let fresh = html.find("Fresh agent").unwrap();
        let old = html.find("Old &lt;b&gt;agent&lt;/b&gt;").unwrap();
        assert!(fresh < old);
        assert!(!html.contains("<b>agent</b>"));
        assert!(html.contains("An agent that does a great many useful t..."));
        assert!(html.contains(r#"<span class="version">v1.0.0</span>"#));
    }

    #[test]
    fn test_history_rows() {
        let entry = HistoryEntry {
            agent_name: "Tool Agent".into(),
            agent_url: "http://localhost:9999".into(),
            message: "What time is it?".into(),
            response: "Task failed".into(),
            is_error: true,
            timestamp: Utc.with_ymd_and_hms(2026, 2, 3, 10, 15, 0).unwrap(),
        };
        let html = render(&[], &[entry], 20);
        assert!(html.contains("2026-02-03 10:15:00"));
        assert!(html.contains(r#"<tr class="error">"#));
        assert!(html.contains("Task failed"));
    }
}
