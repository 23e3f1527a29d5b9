// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry mapping node kinds to display metadata and configuration forms.
//!
//! One table answers every "how does this kind look / which form does it
//! get" question for both the palette and the canvas. Unknown kinds resolve
//! to a generic fallback instead of erroring.

use crate::node::NodeKind;
use indexmap::IndexMap;

/// Palette category a node kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Flow entry points (schedule, webhook)
    Trigger,
    /// Database sources and sinks
    Database,
    /// Outbound API calls
    Api,
    /// Storage, cache and messaging
    Storage,
    /// Mail and webhook responses
    Communication,
    /// AI/ML services
    Ai,
    /// Third-party SaaS services
    External,
    /// Flow-control and data-shaping actions
    Action,
}

impl NodeCategory {
    /// Display name for palette tabs
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Trigger => "Triggers",
            Self::Database => "Databases",
            Self::Api => "APIs",
            Self::Storage => "Storage",
            Self::Communication => "Comm",
            Self::Ai => "AI/ML",
            Self::External => "External",
            Self::Action => "Actions",
        }
    }

    /// All categories in palette order
    pub fn all() -> &'static [NodeCategory] {
        &[
            Self::Trigger,
            Self::Database,
            Self::Api,
            Self::Storage,
            Self::Communication,
            Self::Ai,
            Self::External,
            Self::Action,
        ]
    }
}

/// Which configuration form the properties pane renders for a kind.
///
/// Form rendering dispatches on this, never on individual kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// Webhook/trigger setup: method, auth, content type
    Webhook,
    /// Schedule setup: preset + cron expression
    Schedule,
    /// Connection string + query
    Database,
    /// URL, method, headers
    Api,
    /// Code box
    Transformer,
    /// Operator + comparison value
    Condition,
    /// No dedicated form yet
    Placeholder,
}

/// Display metadata and form selection for one node kind
#[derive(Debug, Clone)]
pub struct NodeSpec {
    /// The kind this spec describes
    pub kind: NodeKind,
    /// Palette/canvas icon
    pub icon: &'static str,
    /// Header color, RGB
    pub color: [u8; 3],
    /// Palette category
    pub category: NodeCategory,
    /// Configuration form
    pub form: FormKind,
}

impl NodeSpec {
    fn new(
        kind: NodeKind,
        icon: &'static str,
        color: [u8; 3],
        category: NodeCategory,
        form: FormKind,
    ) -> Self {
        Self {
            kind,
            icon,
            color,
            category,
            form,
        }
    }
}

/// Registry of node kinds available to the palette and canvas
pub struct NodeRegistry {
    specs: IndexMap<NodeKind, NodeSpec>,
    fallback: NodeSpec,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            specs: IndexMap::new(),
            fallback: NodeSpec::new(
                NodeKind::Other(String::new()),
                "\u{2699}",
                [108, 117, 125],
                NodeCategory::Action,
                FormKind::Placeholder,
            ),
        }
    }

    /// Registry holding the built-in catalog
    pub fn builtin() -> Self {
        use FormKind as F;
        use NodeCategory as C;
        use NodeKind as K;

        let mut registry = Self::new();
        let entries = [
            // Triggers
            NodeSpec::new(K::Schedule, "\u{23f0}", [245, 158, 11], C::Trigger, F::Schedule),
            NodeSpec::new(K::Webhook, "\u{1f517}", [59, 130, 246], C::Trigger, F::Webhook),
            NodeSpec::new(K::Trigger, "\u{1f3af}", [99, 102, 241], C::Trigger, F::Webhook),
            // Databases
            NodeSpec::new(K::Postgresql, "\u{1f418}", [51, 103, 145], C::Database, F::Database),
            NodeSpec::new(K::Mysql, "\u{1f42c}", [0, 117, 143], C::Database, F::Database),
            NodeSpec::new(K::Mariadb, "\u{1f5c3}", [195, 106, 60], C::Database, F::Database),
            NodeSpec::new(K::Tidb, "\u{26a1}", [220, 56, 72], C::Database, F::Database),
            NodeSpec::new(K::Neon, "\u{1f31f}", [0, 229, 153], C::Database, F::Database),
            NodeSpec::new(K::Mongodb, "\u{1f343}", [67, 153, 52], C::Database, F::Database),
            NodeSpec::new(K::Snowflake, "\u{2744}", [41, 181, 232], C::Database, F::Database),
            NodeSpec::new(K::Supabase, "\u{26a1}", [62, 207, 142], C::Database, F::Database),
            NodeSpec::new(K::Clickhouse, "\u{1f4ca}", [252, 255, 116], C::Database, F::Database),
            NodeSpec::new(K::Hydra, "\u{1f40d}", [91, 71, 214], C::Database, F::Database),
            NodeSpec::new(K::Mssql, "\u{1f5c4}", [168, 28, 36], C::Database, F::Database),
            NodeSpec::new(K::Oracle, "\u{1f537}", [199, 70, 52], C::Database, F::Database),
            NodeSpec::new(K::Elasticsearch, "\u{1f50d}", [254, 196, 60], C::Database, F::Database),
            NodeSpec::new(K::Firebase, "\u{1f525}", [255, 160, 0], C::Database, F::Database),
            NodeSpec::new(K::Dynamodb, "\u{1f7e1}", [68, 94, 176], C::Database, F::Database),
            NodeSpec::new(K::Couchdb, "\u{1f6cb}", [226, 55, 43], C::Database, F::Database),
            // APIs
            NodeSpec::new(K::RestApi, "\u{1f310}", [16, 185, 129], C::Api, F::Api),
            NodeSpec::new(K::Graphql, "\u{1f4cb}", [229, 53, 171], C::Api, F::Api),
            // Storage / messaging
            NodeSpec::new(K::S3, "\u{2601}", [227, 86, 0], C::Storage, F::Placeholder),
            NodeSpec::new(K::Redis, "\u{1f534}", [215, 40, 40], C::Storage, F::Placeholder),
            NodeSpec::new(K::Upstash, "\u{26a1}", [0, 185, 107], C::Storage, F::Placeholder),
            // Communication
            NodeSpec::new(K::Smtp, "\u{1f4e7}", [124, 58, 237], C::Communication, F::Placeholder),
            NodeSpec::new(
                K::WebhookResponse,
                "\u{1f4e4}",
                [14, 165, 233],
                C::Communication,
                F::Placeholder,
            ),
            // AI
            NodeSpec::new(K::AiAgent, "\u{1f916}", [139, 92, 246], C::Ai, F::Placeholder),
            NodeSpec::new(K::HuggingFace, "\u{1f917}", [255, 211, 61], C::Ai, F::Placeholder),
            // External services
            NodeSpec::new(K::GoogleSheets, "\u{1f4ca}", [15, 157, 88], C::External, F::Placeholder),
            NodeSpec::new(K::Airtable, "\u{1f4cb}", [44, 126, 255], C::External, F::Placeholder),
            NodeSpec::new(K::Appwrite, "\u{1f4f1}", [253, 54, 110], C::External, F::Placeholder),
            // Actions
            NodeSpec::new(K::Transformer, "\u{2699}", [107, 114, 128], C::Action, F::Transformer),
            NodeSpec::new(K::Condition, "\u{1f500}", [234, 179, 8], C::Action, F::Condition),
            NodeSpec::new(K::Loop, "\u{1f504}", [6, 182, 212], C::Action, F::Placeholder),
            NodeSpec::new(K::Response, "\u{1f4e4}", [34, 197, 94], C::Action, F::Placeholder),
            NodeSpec::new(K::ErrorHandler, "\u{26a0}", [239, 68, 68], C::Action, F::Placeholder),
        ];
        for spec in entries {
            registry.register(spec);
        }
        registry
    }

    /// Register a node spec
    pub fn register(&mut self, spec: NodeSpec) {
        self.specs.insert(spec.kind.clone(), spec);
    }

    /// Look up the spec for a kind, falling back to a generic entry for
    /// kinds outside the catalog
    pub fn spec(&self, kind: &NodeKind) -> &NodeSpec {
        self.specs.get(kind).unwrap_or(&self.fallback)
    }

    /// All registered specs in registration order
    pub fn specs(&self) -> impl Iterator<Item = &NodeSpec> {
        self.specs.values()
    }

    /// Specs belonging to a category
    pub fn specs_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeSpec> {
        self.specs.values().filter(move |s| s.category == category)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_category() {
        let registry = NodeRegistry::builtin();
        for category in NodeCategory::all() {
            assert!(
                registry.specs_in_category(*category).next().is_some(),
                "empty category {category:?}"
            );
        }
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        let registry = NodeRegistry::builtin();
        let spec = registry.spec(&NodeKind::Other("mystery".to_string()));
        assert_eq!(spec.form, FormKind::Placeholder);
        assert_eq!(spec.color, [108, 117, 125]);
    }

    #[test]
    fn test_form_dispatch_by_kind() {
        let registry = NodeRegistry::builtin();
        assert_eq!(registry.spec(&NodeKind::Postgresql).form, FormKind::Database);
        assert_eq!(registry.spec(&NodeKind::RestApi).form, FormKind::Api);
        assert_eq!(registry.spec(&NodeKind::Webhook).form, FormKind::Webhook);
        assert_eq!(registry.spec(&NodeKind::Condition).form, FormKind::Condition);
    }
}
