mod cli;
mod shell;

use anyhow::Result;

use crate::auth::OtpGateway;
use crate::db::{Database, Subscription};
use crate::models::Entry;
use crate::settings::Settings;

pub(crate) use cli::as_cli;
pub(crate) use shell::as_shell;

/// Everything a command needs: the store, settings, the out-of-band gateway
/// and the signed-in identity.
pub(crate) struct Context<'a> {
    pub db: &'a mut Database,
    pub settings: &'a Settings,
    pub gateway: &'a dyn OtpGateway,
    user: Option<String>,
    live: Option<LiveView>,
}

/// Caller-owned snapshot fed by a subscription.
struct LiveView {
    user: String,
    sub: Subscription,
    snapshot: Vec<Entry>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        db: &'a mut Database,
        settings: &'a Settings,
        gateway: &'a dyn OtpGateway,
        user: Option<String>,
    ) -> Self {
        Self {
            db,
            settings,
            gateway,
            user: user.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            live: None,
        }
    }

    pub(crate) fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub(crate) fn set_user(&mut self, user: &str) {
        self.user = Some(user.to_string());
        if self.live.as_ref().is_some_and(|l| l.user != user) {
            self.live = None;
        }
    }

    /// The signed-in identity, which must already own a collection.
    pub(crate) fn require_user(&self) -> Result<String> {
        let Some(user) = self.user.clone() else {
            anyhow::bail!("Not signed in. Run `budgetwiz login <email>` or pass --user <email>");
        };
        if !self.db.user_exists(&user)? {
            anyhow::bail!("No data for {user}. Run `budgetwiz login {user}` first");
        }
        Ok(user)
    }

    /// Start (or keep) a live subscription for the signed-in user.
    pub(crate) fn watch(&mut self) -> Result<()> {
        let user = self.require_user()?;
        if self.live.as_ref().is_some_and(|l| l.user == user) {
            return Ok(());
        }
        let sub = self.db.subscribe_entries(&user)?;
        let snapshot = sub.latest().unwrap_or_default();
        self.live = Some(LiveView {
            user,
            sub,
            snapshot,
        });
        Ok(())
    }

    /// Take any newer snapshot from the subscription. Returns true when the
    /// held snapshot changed.
    pub(crate) fn refresh(&mut self) -> bool {
        let Some(live) = self.live.as_mut() else {
            return false;
        };
        match live.sub.latest() {
            Some(snapshot) => {
                live.snapshot = snapshot;
                true
            }
            None => false,
        }
    }

    pub(crate) fn live_snapshot(&self) -> Option<&[Entry]> {
        self.live.as_ref().map(|l| l.snapshot.as_slice())
    }

    /// Current entries for `user`: the live snapshot when one is held,
    /// otherwise a fresh read.
    pub(crate) fn entries(&mut self, user: &str) -> Result<Vec<Entry>> {
        self.refresh();
        match &self.live {
            Some(live) if live.user == user => Ok(live.snapshot.clone()),
            _ => self.db.get_entries(user),
        }
    }
}
