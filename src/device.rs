//! Prompt state machine for the Cisco telnet CLI.
//!
//! [`PromptScanner`] owns the accumulating receive buffer of one session and
//! turns it into [`Step`]s. Every trigger is a fixed literal compiled into a
//! [`RegexSet`]; when several match, the lowest index wins, so evaluation
//! order is explicit and independent of how the bytes were fragmented.
//!
//! The scanner never touches a transport: callers feed received bytes with
//! [`PromptScanner::feed`] and drain [`PromptScanner::step`] until it
//! returns `None`, writing every [`Step::Send`] payload to the switch.

use std::fmt;

use log::trace;
use once_cell::sync::Lazy;
use regex::bytes::{Regex, RegexSet};

use crate::config::{
    AUTH_FAILURE_BANNERS, CMD_SHOW_NEIGHBORS, DEVICE_SEPARATOR, NEW_LINE, SPACE, TXT_LOGIN,
    TXT_MORE, TXT_PASSWORD, TXT_PROMPT, TXT_TIMEOUT_EXPIRED, TXT_USERNAME,
};

/// Login-phase buffer size after which the oldest bytes are dropped.
const LOGIN_BUFFER_LIMIT: usize = 4096;

/// Bytes kept when the login buffer is trimmed; longer than any trigger.
const LOGIN_BUFFER_KEEP: usize = 256;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Authenticating,
    Ready,
    FetchingNeighbors,
    Closed,
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Authenticating => "authenticating",
            SessionState::Ready => "ready",
            SessionState::FetchingNeighbors => "fetching-neighbors",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Recognizable fragments of CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    UsernamePrompt,
    PasswordPrompt,
    AuthenticationFailed,
    TimeoutExpired,
    More,
    Prompt,
}

/// What the session has to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Write these bytes to the switch.
    Send(String),
    /// Login finished at a user prompt.
    Authenticated,
    /// The switch refused the credentials.
    Rejected,
    /// The switch closed the login with "timeout expired".
    Expired,
    /// The neighbor command completed; payload is the cleaned dump.
    NeighborDump(String),
}

struct TriggerSet {
    set: RegexSet,
    triggers: Vec<Trigger>,
}

impl TriggerSet {
    fn build(entries: Vec<(Trigger, String)>) -> Self {
        let (triggers, patterns): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        let set = match RegexSet::new(&patterns) {
            Ok(set) => set,
            Err(err) => panic!("invalid trigger regex set: {err}"),
        };
        Self { set, triggers }
    }

    /// Highest priority trigger matching `buffer`.
    fn first_match(&self, buffer: &[u8]) -> Option<Trigger> {
        self.set
            .matches(buffer)
            .iter()
            .next()
            .and_then(|i| self.triggers.get(i).copied())
    }
}

fn literal(s: &str) -> String {
    regex::escape(s)
}

fn any_of(items: &[&str]) -> String {
    items.iter().map(|s| literal(s)).collect::<Vec<_>>().join("|")
}

fn prompt_at_end() -> String {
    format!(r"{}\z", literal(TXT_PROMPT))
}

/// Triggers evaluated while logging in, in priority order.
static LOGIN_TRIGGERS: Lazy<TriggerSet> = Lazy::new(|| {
    TriggerSet::build(vec![
        (Trigger::UsernamePrompt, any_of(&[TXT_USERNAME, TXT_LOGIN])),
        (Trigger::PasswordPrompt, literal(TXT_PASSWORD)),
        (Trigger::AuthenticationFailed, any_of(AUTH_FAILURE_BANNERS)),
        (Trigger::TimeoutExpired, literal(TXT_TIMEOUT_EXPIRED)),
        (Trigger::Prompt, prompt_at_end()),
    ])
});

/// Triggers evaluated while reading the prompt and the neighbor table.
static FETCH_TRIGGERS: Lazy<TriggerSet> = Lazy::new(|| {
    TriggerSet::build(vec![
        (Trigger::More, literal(TXT_MORE)),
        (Trigger::Prompt, prompt_at_end()),
    ])
});

/// Matches the backspace/space runs a switch prints to erase the pagination
/// marker once it has been answered.
static ERASE_SEQUENCE: Lazy<Regex> = Lazy::new(|| match Regex::new(r"\x08+ *\x08*") {
    Ok(re) => re,
    Err(err) => panic!("invalid ERASE_SEQUENCE regex: {err}"),
});

/// Transport-independent protocol state of one CLI session.
pub struct PromptScanner {
    state: SessionState,
    buffer: Vec<u8>,
    username: String,
    password: String,
    /// Set once the neighbor command has been sent.
    command_started: bool,
    device_name: Option<String>,
}

impl Default for PromptScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptScanner {
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            buffer: Vec::new(),
            username: String::new(),
            password: String::new(),
            command_started: false,
            device_name: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Display name read from the prompt during the fetch phase.
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Starts the login exchange with fresh state.
    pub fn begin_login(&mut self, username: &str, password: &str) {
        self.buffer.clear();
        self.username = username.to_string();
        self.password = password.to_string();
        self.command_started = false;
        self.device_name = None;
        self.state = SessionState::Authenticating;
    }

    /// Starts reading the identity and neighbor table of a ready session.
    ///
    /// Returns the bytes that elicit a fresh prompt.
    pub fn begin_fetch(&mut self) -> String {
        self.buffer.clear();
        self.command_started = false;
        self.device_name = None;
        self.state = SessionState::FetchingNeighbors;
        NEW_LINE.to_string()
    }

    pub fn close(&mut self) {
        self.buffer.clear();
        self.state = SessionState::Closed;
    }

    /// Marks the session as broken, e.g. after a transport failure.
    pub fn fail(&mut self) {
        self.buffer.clear();
        self.state = SessionState::Error;
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        if self.state == SessionState::Authenticating && self.buffer.len() > LOGIN_BUFFER_LIMIT {
            let cut = self.buffer.len() - LOGIN_BUFFER_KEEP;
            self.buffer.drain(..cut);
        }
    }

    /// Evaluates the buffer and returns the next action, if any.
    pub fn step(&mut self) -> Option<Step> {
        match self.state {
            SessionState::Authenticating => self.login_step(),
            SessionState::FetchingNeighbors => self.fetch_step(),
            _ => None,
        }
    }

    fn login_step(&mut self) -> Option<Step> {
        let trigger = LOGIN_TRIGGERS.first_match(&self.buffer)?;
        trace!("Login trigger: {:?}", trigger);
        match trigger {
            Trigger::UsernamePrompt => {
                self.buffer.clear();
                Some(Step::Send(format!("{}{}", self.username, NEW_LINE)))
            }
            Trigger::PasswordPrompt => {
                self.buffer.clear();
                Some(Step::Send(format!("{}{}", self.password, NEW_LINE)))
            }
            Trigger::AuthenticationFailed => {
                self.fail();
                Some(Step::Rejected)
            }
            Trigger::TimeoutExpired => {
                self.fail();
                Some(Step::Expired)
            }
            Trigger::Prompt => {
                self.buffer.clear();
                self.state = SessionState::Ready;
                Some(Step::Authenticated)
            }
            Trigger::More => None,
        }
    }

    fn fetch_step(&mut self) -> Option<Step> {
        let trigger = FETCH_TRIGGERS.first_match(&self.buffer)?;
        trace!("Fetch trigger: {:?}", trigger);
        match trigger {
            Trigger::More => {
                if let Some(pos) = find(&self.buffer, TXT_MORE.as_bytes()) {
                    self.buffer.drain(pos..pos + TXT_MORE.len());
                }
                Some(Step::Send(SPACE.to_string()))
            }
            Trigger::Prompt if !self.command_started => {
                let end = self.buffer.len() - TXT_PROMPT.len();
                let text = String::from_utf8_lossy(&self.buffer[..end]).trim().to_string();
                trace!("Prompt name: {:?}", text);
                self.device_name = Some(text);
                self.buffer.clear();
                self.command_started = true;
                Some(Step::Send(format!("{}{}", CMD_SHOW_NEIGHBORS, NEW_LINE)))
            }
            Trigger::Prompt => {
                let dump = clean_dump(&self.buffer);
                self.buffer.clear();
                self.command_started = false;
                self.state = SessionState::Ready;
                Some(Step::NeighborDump(dump))
            }
            _ => None,
        }
    }
}

/// Strips the command echo, surrounding whitespace and one leading
/// separator line from the raw command output.
fn clean_dump(raw: &[u8]) -> String {
    let erased = ERASE_SEQUENCE.replace_all(raw, &b""[..]);
    let text = String::from_utf8_lossy(&erased).replace(CMD_SHOW_NEIGHBORS, "");
    let text = text.trim();
    match text.strip_prefix(DEVICE_SEPARATOR) {
        Some(rest) => rest.trim_start_matches(['\r', '\n']).to_string(),
        None => text.to_string(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::{PromptScanner, SessionState, Step};

    fn drain(scanner: &mut PromptScanner) -> Vec<Step> {
        let mut steps = Vec::new();
        while let Some(step) = scanner.step() {
            steps.push(step);
        }
        steps
    }

    fn feed_bytewise(scanner: &mut PromptScanner, text: &str) -> Vec<Step> {
        let mut steps = Vec::new();
        for b in text.as_bytes() {
            scanner.feed(std::slice::from_ref(b));
            steps.extend(drain(scanner));
        }
        steps
    }

    fn logged_in() -> PromptScanner {
        let mut scanner = PromptScanner::new();
        scanner.begin_login("admin", "secret");
        feed_bytewise(&mut scanner, "Username: ");
        feed_bytewise(&mut scanner, "Password: ");
        feed_bytewise(&mut scanner, "\r\nsw-core>");
        scanner
    }

    #[test]
    fn login_answers_prompts_and_reaches_ready() {
        let mut scanner = PromptScanner::new();
        scanner.begin_login("admin", "secret");

        let steps = feed_bytewise(&mut scanner, "\r\nUser Access Verification\r\n\r\nUsername: ");
        assert_eq!(steps, vec![Step::Send("admin\n".to_string())]);

        let steps = feed_bytewise(&mut scanner, "admin\r\nPassword: ");
        assert_eq!(steps, vec![Step::Send("secret\n".to_string())]);

        let steps = feed_bytewise(&mut scanner, "\r\nsw-core>");
        assert_eq!(steps, vec![Step::Authenticated]);
        assert_eq!(scanner.state(), SessionState::Ready);
    }

    #[test]
    fn login_prompt_variant_is_accepted() {
        let mut scanner = PromptScanner::new();
        scanner.begin_login("ops", "pw");

        scanner.feed(b"Login: ");
        assert_eq!(scanner.step(), Some(Step::Send("ops\n".to_string())));
    }

    #[test]
    fn failure_banners_reject_login() {
        for banner in ["% Authentication failed", "% Login invalid", "% Bad passwords"] {
            let mut scanner = PromptScanner::new();
            scanner.begin_login("admin", "wrong");
            scanner.feed(b"Password: ");
            assert!(matches!(scanner.step(), Some(Step::Send(_))));

            let steps = feed_bytewise(&mut scanner, &format!("\r\n{banner}\r\n"));
            assert_eq!(steps, vec![Step::Rejected], "banner {banner:?}");
            assert_eq!(scanner.state(), SessionState::Error);
        }
    }

    #[test]
    fn timeout_banner_ends_login() {
        let mut scanner = PromptScanner::new();
        scanner.begin_login("admin", "secret");

        let steps = feed_bytewise(&mut scanner, "Username: \r\n% Username:  timeout expired!");
        assert_eq!(steps.last(), Some(&Step::Expired));
    }

    #[test]
    fn username_prompt_outranks_other_triggers_in_one_chunk() {
        let mut scanner = PromptScanner::new();
        scanner.begin_login("admin", "secret");

        scanner.feed(b"% Login invalid\r\n\r\nUsername: ");
        assert_eq!(scanner.step(), Some(Step::Send("admin\n".to_string())));
        assert_eq!(scanner.step(), None);
    }

    #[test]
    fn fetch_reads_name_then_sends_neighbor_command() {
        let mut scanner = logged_in();
        assert_eq!(scanner.begin_fetch(), "\n");

        let steps = feed_bytewise(&mut scanner, "\r\n sw-core>");
        assert_eq!(steps, vec![Step::Send("sh cdp nei det\n".to_string())]);
        assert_eq!(scanner.device_name(), Some("sw-core"));

        let steps = feed_bytewise(
            &mut scanner,
            "sh cdp nei det\r\n-------------------------\r\nDevice ID: sw-2\r\nsw-core>",
        );
        assert_eq!(steps, vec![Step::NeighborDump("Device ID: sw-2\r\nsw-core>".to_string())]);
        assert_eq!(scanner.state(), SessionState::Ready);
    }

    #[test]
    fn pagination_marker_is_stripped_and_answered() {
        let mut scanner = logged_in();
        scanner.begin_fetch();
        feed_bytewise(&mut scanner, "sw-core>");

        let steps = feed_bytewise(&mut scanner, "line one\r\n --More-- ");
        assert_eq!(steps, vec![Step::Send(" ".to_string())]);

        let steps = feed_bytewise(&mut scanner, "\x08\x08\x08\x08\x08\x08\x08\x08\x08        \x08\x08\x08\x08\x08\x08\x08\x08\x08line two\r\nsw-core>");
        match steps.as_slice() {
            [Step::NeighborDump(dump)] => {
                assert!(!dump.contains("--More--"));
                assert!(!dump.contains('\u{8}'));
                assert!(dump.contains("line one"));
                assert!(dump.contains("line two"));
            }
            other => panic!("unexpected steps: {other:?}"),
        }
    }

    #[test]
    fn idle_states_produce_no_steps() {
        let mut scanner = PromptScanner::new();
        scanner.feed(b"Username: ");
        assert_eq!(scanner.step(), None);

        scanner.close();
        assert_eq!(scanner.state(), SessionState::Closed);
        assert_eq!(scanner.step(), None);
    }

    #[test]
    fn long_banner_keeps_login_buffer_bounded() {
        let mut scanner = PromptScanner::new();
        scanner.begin_login("admin", "secret");

        scanner.feed(&vec![b'*'; 10_000]);
        assert_eq!(scanner.step(), None);
        scanner.feed(b"\r\nUsername: ");
        assert_eq!(scanner.step(), Some(Step::Send("admin\n".to_string())));
    }
}
