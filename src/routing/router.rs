//! Table construction and event dispatch.
//!
//! # Responsibilities
//! - Build the per-tier command tables from module registrations
//! - Resolve messages to at most one command handler
//! - Dispatch notice/request/meta events
//!
//! # Design Decisions
//! - Tier authorization is cumulative: the walk starts at the sender's
//!   resolved level and descends to the lowest one
//! - A directed message is matched against the directed tables only
//! - Keyword registrations share the full-match table (current behavior)

use std::collections::HashMap;

use crate::api::ApiHandle;
use crate::event::{Event, EventKind};
use crate::message;
use crate::observability::metrics;
use crate::permission::{PermissionLevel, PermissionResolver, SenderInfo, LEVEL_COUNT};
use crate::routing::trie::Trie;
use crate::routing::{Handler, MatchKind, RegistryError};
use crate::tasks::HandlerPool;

/// Veto hook consulted before any dispatch.
pub type EventFilter = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// Command tables for one direction (open or directed-at-me).
struct CommandTables {
    fullmatch: [HashMap<String, Handler>; LEVEL_COUNT],
    prefix: [Trie<Handler>; LEVEL_COUNT],
    suffix: [Trie<Handler>; LEVEL_COUNT],
}

impl Default for CommandTables {
    fn default() -> Self {
        Self {
            fullmatch: std::array::from_fn(|_| HashMap::new()),
            prefix: std::array::from_fn(|_| Trie::new()),
            suffix: std::array::from_fn(|_| Trie::new()),
        }
    }
}

impl CommandTables {
    fn insert(
        &mut self,
        kind: MatchKind,
        key: &str,
        handler: Handler,
        level: PermissionLevel,
    ) -> bool {
        let i = level.index();
        match kind {
            // Keyword aliases the full-match table.
            MatchKind::FullMatch | MatchKind::Keyword => {
                if self.fullmatch[i].contains_key(key) {
                    return false;
                }
                self.fullmatch[i].insert(key.to_string(), handler);
                true
            }
            MatchKind::Prefix => self.prefix[i].insert(key, handler),
            MatchKind::Suffix => self.suffix[i].insert_reversed(key, handler),
            MatchKind::CatchAll => unreachable!("catch-all registrations take no key"),
        }
    }

    /// Resolution order within one tier: FullMatch → Prefix → Suffix.
    fn lookup(&self, level: PermissionLevel, text: &str) -> Option<(Handler, i32)> {
        let i = level.index();
        if let Some(handler) = self.fullmatch[i].get(text) {
            return Some((handler.clone(), 0));
        }
        if let Some((handler, len)) = self.prefix[i].search(text) {
            return Some((handler.clone(), len));
        }
        if let Some((handler, len)) = self.suffix[i].search_reversed(text) {
            return Some((handler.clone(), len));
        }
        None
    }
}

/// Registration surface. Modules register against the builder at startup;
/// [`RouterBuilder::build`] freezes the tables.
pub struct RouterBuilder {
    open: CommandTables,
    directed: CommandTables,
    catch_all: [Vec<Handler>; LEVEL_COUNT],
    notices: HashMap<String, HashMap<String, Vec<Handler>>>,
    requests: HashMap<String, HashMap<String, Vec<Handler>>>,
    resolver: Box<dyn PermissionResolver>,
    filter: Option<EventFilter>,
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder").finish_non_exhaustive()
    }
}

impl RouterBuilder {
    pub fn new(resolver: Box<dyn PermissionResolver>) -> Self {
        Self {
            open: CommandTables::default(),
            directed: CommandTables::default(),
            catch_all: std::array::from_fn(|_| Vec::new()),
            notices: HashMap::new(),
            requests: HashMap::new(),
            resolver,
            filter: None,
        }
    }

    /// Install a predicate consulted before any dispatch; returning `false`
    /// drops the event silently.
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Register one command key. Duplicate keys within the same
    /// (kind, level, directed) partition are a fatal configuration error.
    pub fn on_command(
        &mut self,
        kind: MatchKind,
        key: &str,
        handler: Handler,
        level: PermissionLevel,
        directed_only: bool,
    ) -> Result<&mut Self, RegistryError> {
        if kind == MatchKind::CatchAll {
            self.catch_all[level.index()].push(handler);
            return Ok(self);
        }
        let tables = if directed_only {
            &mut self.directed
        } else {
            &mut self.open
        };
        if !tables.insert(kind, key, handler, level) {
            return Err(RegistryError::DuplicateCommand {
                kind,
                key: key.to_string(),
                level,
                directed: directed_only,
            });
        }
        Ok(self)
    }

    /// Register the same handler under several full-match keys.
    pub fn on_fullmatch(
        &mut self,
        keys: &[&str],
        handler: Handler,
        level: PermissionLevel,
        directed_only: bool,
    ) -> Result<&mut Self, RegistryError> {
        for key in keys {
            self.on_command(MatchKind::FullMatch, key, handler.clone(), level, directed_only)?;
        }
        Ok(self)
    }

    /// Register the same handler under several prefix keys.
    pub fn on_prefix(
        &mut self,
        keys: &[&str],
        handler: Handler,
        level: PermissionLevel,
        directed_only: bool,
    ) -> Result<&mut Self, RegistryError> {
        for key in keys {
            self.on_command(MatchKind::Prefix, key, handler.clone(), level, directed_only)?;
        }
        Ok(self)
    }

    /// Register the same handler under several suffix keys.
    pub fn on_suffix(
        &mut self,
        keys: &[&str],
        handler: Handler,
        level: PermissionLevel,
        directed_only: bool,
    ) -> Result<&mut Self, RegistryError> {
        for key in keys {
            self.on_command(MatchKind::Suffix, key, handler.clone(), level, directed_only)?;
        }
        Ok(self)
    }

    /// Register a catch-all handler for messages at or below `level`.
    pub fn on_message(&mut self, handler: Handler, level: PermissionLevel) -> &mut Self {
        self.catch_all[level.index()].push(handler);
        self
    }

    /// Register a notice handler for the exact (type, sub_type) pair.
    pub fn on_notice(&mut self, notice_type: &str, sub_type: &str, handler: Handler) -> &mut Self {
        self.notices
            .entry(notice_type.to_string())
            .or_default()
            .entry(sub_type.to_string())
            .or_default()
            .push(handler);
        self
    }

    /// Register a request handler for the exact (type, sub_type) pair.
    pub fn on_request(
        &mut self,
        request_type: &str,
        sub_type: &str,
        handler: Handler,
    ) -> &mut Self {
        self.requests
            .entry(request_type.to_string())
            .or_default()
            .entry(sub_type.to_string())
            .or_default()
            .push(handler);
        self
    }

    pub fn build(self) -> Router {
        Router {
            open: self.open,
            directed: self.directed,
            catch_all: self.catch_all,
            notices: self.notices,
            requests: self.requests,
            resolver: self.resolver,
            filter: self.filter,
        }
    }
}

/// Immutable routing tables plus the dispatch logic. Shared via `Arc`
/// between all process workers; dispatch takes `&self` and never locks.
pub struct Router {
    open: CommandTables,
    directed: CommandTables,
    catch_all: [Vec<Handler>; LEVEL_COUNT],
    notices: HashMap<String, HashMap<String, Vec<Handler>>>,
    requests: HashMap<String, HashMap<String, Vec<Handler>>>,
    resolver: Box<dyn PermissionResolver>,
    filter: Option<EventFilter>,
}

impl Router {
    pub fn builder(resolver: Box<dyn PermissionResolver>) -> RouterBuilder {
        RouterBuilder::new(resolver)
    }

    /// Classify and dispatch one parsed, non-response document. Matched
    /// handlers are submitted to `pool`; this method never waits on them.
    pub fn dispatch(&self, event: Event, api: &ApiHandle, pool: &HandlerPool) {
        if let Some(filter) = &self.filter {
            if !filter(&event) {
                return;
            }
        }
        match event.kind() {
            EventKind::Message => self.dispatch_message(event, api, pool),
            EventKind::Notice => self.dispatch_flat(&self.notices, event, api, pool),
            EventKind::Request => self.dispatch_flat(&self.requests, event, api, pool),
            EventKind::Meta => Self::observe_meta(&event),
            EventKind::ApiResponse | EventKind::Unknown => {
                tracing::debug!(doc = %event.raw(), "undispatchable document dropped");
            }
        }
    }

    fn dispatch_message(&self, mut event: Event, api: &ApiHandle, pool: &HandlerPool) {
        tracing::info!(
            self_id = event.self_id(),
            user_id = event.user_id(),
            group_id = event.group_id(),
            message = event.message().unwrap_or(""),
            "message received"
        );
        let level = self.prepare(&mut event);
        if let Some(handler) = self.match_tiers(&mut event, level) {
            metrics::record_dispatch("command");
            pool.submit(handler(event, api.clone()));
            return;
        }
        for tier in level.iter_down() {
            for handler in &self.catch_all[tier.index()] {
                metrics::record_dispatch("catch_all");
                pool.submit(handler(event.clone(), api.clone()));
            }
        }
    }

    /// Resolve the sender's level and detect a leading mention of the bot.
    /// When directed, the mention segment and following spaces are stripped
    /// so matching and handlers both see the bare command text.
    fn prepare(&self, event: &mut Event) -> PermissionLevel {
        let level = match event.sender() {
            Some(sender) => self.resolver.resolve(&sender),
            // No sender identity: treat as an ordinary sender.
            None => self.resolver.resolve(&SenderInfo {
                user_id: 0,
                group_id: event.group_id(),
                role: None,
            }),
        };
        let stripped = event.message().and_then(|text| {
            let mention = message::leading_mention(text)?;
            (Some(mention.target) == event.self_id()).then(|| mention.rest.to_string())
        });
        if let Some(rest) = stripped {
            event.to_me = true;
            event.set_message(rest);
        }
        level
    }

    /// Walk tiers from `level` down to the lowest, trying exactly one match
    /// per tier. Annotates the matched command length on a hit.
    fn match_tiers(&self, event: &mut Event, level: PermissionLevel) -> Option<Handler> {
        let text = event.message()?.to_string();
        if text.is_empty() {
            return None;
        }
        let tables = if event.to_me { &self.directed } else { &self.open };
        for tier in level.iter_down() {
            if let Some((handler, len)) = tables.lookup(tier, &text) {
                event.command_len = len;
                return Some(handler);
            }
        }
        None
    }

    /// Resolve a message event to its command handler, annotating the event
    /// the same way dispatch would. `None` means the catch-all path runs.
    pub fn resolve_command(&self, event: &mut Event) -> Option<Handler> {
        let level = self.prepare(event);
        self.match_tiers(event, level)
    }

    fn dispatch_flat(
        &self,
        registry: &HashMap<String, HashMap<String, Vec<Handler>>>,
        event: Event,
        api: &ApiHandle,
        pool: &HandlerPool,
    ) {
        let type_key = event
            .notice_type()
            .or_else(|| event.request_type())
            .unwrap_or("");
        let sub_type = event.sub_type().unwrap_or("");
        tracing::info!(
            self_id = event.self_id(),
            kind = type_key,
            sub_type,
            "notification received"
        );
        let Some(handlers) = registry.get(type_key).and_then(|m| m.get(sub_type)) else {
            return;
        };
        for handler in handlers {
            metrics::record_dispatch("flat");
            pool.submit(handler(event.clone(), api.clone()));
        }
    }

    /// Meta events carry connection lifecycle only; nothing is dispatched.
    fn observe_meta(event: &Event) {
        match event.meta_event_type() {
            Some("lifecycle") => match event.sub_type() {
                Some("connect") | Some("enable") => {
                    tracing::info!(self_id = event.self_id(), "gateway connection established");
                }
                Some("disconnect") => {
                    tracing::info!(self_id = event.self_id(), "gateway connection closed");
                }
                _ => {}
            },
            _ => {
                tracing::debug!(self_id = event.self_id(), "heartbeat");
            }
        }
    }
}
