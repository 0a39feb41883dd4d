//! Fort change classification and webhook emission.

use crate::areas::AreaMatcher;
use crate::stats::FortCountChange;
use crate::stats::StatsCollector;
use crate::webhooks::WebhookCollector;
use fortwatch_wire::ChangeType;
use fortwatch_wire::EditType;
use fortwatch_wire::FortChange;
use fortwatch_wire::FortWebhook;
use fortwatch_wire::WebhookMessage;
use fortwatch_wire::webhook::FORT_UPDATE;
use std::sync::Arc;
use tracing::debug;
use tracing::warn;
use url::Url;

/// Coordinate delta, in degrees, below which a fort has not moved.
pub const FLOAT_TOLERANCE: f64 = 0.000001;

/// Fields that differ between two views of the same fort, in reporting order.
pub fn edit_types(old: &FortWebhook, new: &FortWebhook) -> Vec<EditType> {
    let mut edits = Vec::new();
    if text(&old.name) != text(&new.name) {
        edits.push(EditType::Name);
    }
    if text(&old.description) != text(&new.description) {
        edits.push(EditType::Description);
    }
    if image_path(old.image_url.as_deref()) != image_path(new.image_url.as_deref()) {
        edits.push(EditType::ImageUrl);
    }
    if (old.location.lat - new.location.lat).abs() > FLOAT_TOLERANCE
        || (old.location.lon - new.location.lon).abs() > FLOAT_TOLERANCE
    {
        edits.push(EditType::Location);
    }
    edits
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// URL path without its leading `/`; the host and scheme are ignored.
fn image_path(url: Option<&str>) -> String {
    url.filter(|url| !url.is_empty())
        .and_then(|url| Url::parse(url).ok())
        .map(|url| url.path().trim_start_matches('/').to_string())
        .unwrap_or_default()
}

pub struct ChangeNotifier {
    areas: Arc<dyn AreaMatcher>,
    stats: Arc<dyn StatsCollector>,
    webhooks: WebhookCollector,
}

impl ChangeNotifier {
    pub fn new(
        areas: Arc<dyn AreaMatcher>,
        stats: Arc<dyn StatsCollector>,
        webhooks: WebhookCollector,
    ) -> Self {
        Self {
            areas,
            stats,
            webhooks,
        }
    }

    /// Emits the change if there is one. Returns whether a webhook was queued.
    pub fn notify(
        &self,
        old: Option<&FortWebhook>,
        new: Option<&FortWebhook>,
        change_type: ChangeType,
    ) -> bool {
        let (view, edits) = match (change_type, old, new) {
            (ChangeType::New, _, Some(new)) => (new, None),
            (ChangeType::Removal, Some(old), _) => (old, None),
            (ChangeType::Edit, Some(old), Some(new)) => {
                let edits = edit_types(old, new);
                if edits.is_empty() {
                    return false;
                }
                (new, Some(edits))
            }
            _ => {
                warn!("{} notification without the view it needs", change_type.as_str());
                return false;
            }
        };

        let areas = self.areas.match_areas(view.location);
        match change_type {
            ChangeType::New => {
                self.stats
                    .fort_count_changed(&areas, view.fort_type, FortCountChange::Addition);
            }
            ChangeType::Removal => {
                self.stats
                    .fort_count_changed(&areas, view.fort_type, FortCountChange::Removal);
            }
            ChangeType::Edit => {}
        }

        let change = FortChange {
            change_type,
            edit_types: edits,
            old: (change_type != ChangeType::New).then(|| old.cloned()).flatten(),
            new: (change_type != ChangeType::Removal).then(|| new.cloned()).flatten(),
        };
        let message = match serde_json::to_value(&change) {
            Ok(message) => message,
            Err(err) => {
                warn!("failed to encode fort change for {}: {err}", view.id);
                return false;
            }
        };
        debug!("fort {} {} in {} areas", view.id, change_type.as_str(), areas.len());
        self.webhooks.publish(WebhookMessage {
            message_type: FORT_UPDATE.to_string(),
            areas,
            message,
        })
    }
}
