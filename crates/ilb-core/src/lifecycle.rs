use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{GroupId, InviteLink, UserId};
use crate::errors::Error;
use crate::ports::{Directory, InviteGateway, LinkStore};
use crate::Result;

/// Outcome of [`LinkService::ensure_link`]: whether the caller got their
/// stored link back or a freshly minted one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    Existing(InviteLink),
    Created(InviteLink),
}

impl EnsureOutcome {
    pub fn link(&self) -> &InviteLink {
        match self {
            Self::Existing(link) | Self::Created(link) => link,
        }
    }
}

/// Counters reported by [`LinkService::scan_group`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Records examined.
    pub checked: u32,
    /// Records deleted because the user left the group.
    pub cleaned: u32,
    /// Links successfully revoked upstream (at most `cleaned`).
    pub revoked: u32,
}

/// The link-lifecycle state machine.
///
/// Per `(group, user)` pair the states are NoLink -> Active -> NoLink.
/// There is no persisted "revoked" state: a revocation is always followed
/// immediately by a replacement link or by deletion of the record.
pub struct LinkService {
    group: GroupId,
    directory: Arc<dyn Directory>,
    store: Arc<dyn LinkStore>,
    gateway: Arc<dyn InviteGateway>,
}

impl LinkService {
    pub fn new(
        group: GroupId,
        directory: Arc<dyn Directory>,
        store: Arc<dyn LinkStore>,
        gateway: Arc<dyn InviteGateway>,
    ) -> Self {
        Self {
            group,
            directory,
            store,
            gateway,
        }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Admin check against the configured group (fail-closed).
    pub async fn is_admin(&self, user: UserId) -> bool {
        self.directory.is_admin(self.group, user).await
    }

    /// Hand the user their invite link, minting one only if none is stored.
    ///
    /// Requesting a link you already hold never calls the gateway.
    pub async fn ensure_link(&self, user: UserId) -> Result<EnsureOutcome> {
        if !self.directory.is_member(self.group, user).await {
            return Err(Error::NotMember);
        }

        if let Some(link) = self.store.get(self.group, user).await? {
            return Ok(EnsureOutcome::Existing(link));
        }

        let link = self.gateway.create_link(self.group, user).await?;

        // Insert-if-absent closes the check-then-act race: when a concurrent
        // request stored a link first, serve that one and revoke our orphan.
        match self.store.put_if_absent(self.group, user, &link).await? {
            None => {
                info!(user = user.0, "issued new invite link");
                Ok(EnsureOutcome::Created(link))
            }
            Some(existing) => {
                if let Err(e) = self.gateway.revoke_link(self.group, &link).await {
                    warn!(user = user.0, error = %e, "failed to revoke orphaned invite link");
                }
                Ok(EnsureOutcome::Existing(existing))
            }
        }
    }

    /// Replace the user's stored link: revoke the old one, then mint and
    /// store a new one. Never creates from nothing.
    pub async fn remake_link(&self, user: UserId) -> Result<InviteLink> {
        if !self.directory.is_member(self.group, user).await {
            return Err(Error::NotMember);
        }

        let Some(old) = self.store.get(self.group, user).await? else {
            return Err(Error::NoExistingLink);
        };

        // Revoke strictly before create; a failed revoke aborts with the old
        // record intact rather than risking two live links.
        self.gateway.revoke_link(self.group, &old).await?;

        let new = match self.gateway.create_link(self.group, user).await {
            Ok(link) => link,
            Err(e) => {
                // The old link is already dead; drop the record so the pair
                // converges to NoLink and a retry can mint a fresh link.
                if let Err(del) = self.store.delete(self.group, user).await {
                    warn!(user = user.0, error = %del, "failed to delete record of revoked link");
                }
                return Err(e);
            }
        };

        self.store.put(self.group, user, &new).await?;
        info!(user = user.0, "regenerated invite link");
        Ok(new)
    }

    /// Reconcile stored records against live membership: records of users no
    /// longer in the group are revoked (best-effort) and deleted.
    ///
    /// Each record is judged independently against current membership, so
    /// re-running a scan is safe and convergent.
    pub async fn scan_group(&self, requested_by: UserId) -> Result<ScanReport> {
        if !self.directory.is_admin(self.group, requested_by).await {
            return Err(Error::NotAdmin);
        }

        let mut report = ScanReport::default();
        for (user, link) in self.store.list_group(self.group).await? {
            report.checked += 1;

            if self.directory.is_member(self.group, user).await {
                continue;
            }

            match self.gateway.revoke_link(self.group, &link).await {
                Ok(()) => report.revoked += 1,
                Err(e) => {
                    warn!(user = user.0, error = %e, "failed to revoke link of departed user")
                }
            }

            // Delete even when the revoke failed: a stale record must not
            // outlive stale membership.
            self.store.delete(self.group, user).await?;
            report.cleaned += 1;
        }

        info!(
            checked = report.checked,
            cleaned = report.cleaned,
            revoked = report.revoked,
            "scan finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::store::MemoryLinkStore;

    const GROUP: GroupId = GroupId(-1001);

    #[derive(Default)]
    struct FakeDirectory {
        members: HashSet<i64>,
        admins: HashSet<i64>,
    }

    impl FakeDirectory {
        fn with_members(ids: &[i64]) -> Self {
            Self {
                members: ids.iter().copied().collect(),
                admins: HashSet::new(),
            }
        }

        fn with_admin(mut self, id: i64) -> Self {
            self.admins.insert(id);
            self
        }
    }

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn is_member(&self, _group: GroupId, user: UserId) -> bool {
            self.members.contains(&user.0)
        }

        async fn is_admin(&self, _group: GroupId, user: UserId) -> bool {
            self.admins.contains(&user.0)
        }
    }

    /// Records every call; `calls` keeps create/revoke interleaving.
    #[derive(Default)]
    struct FakeGateway {
        counter: AtomicU32,
        calls: Mutex<Vec<String>>,
        fail_create: AtomicBool,
        fail_revoke: AtomicBool,
    }

    impl FakeGateway {
        fn fail_create(self) -> Self {
            self.fail_create.store(true, Ordering::SeqCst);
            self
        }

        fn fail_revoke(self) -> Self {
            self.fail_revoke.store(true, Ordering::SeqCst);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn created(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.starts_with("create"))
                .count()
        }

        fn revoked(&self) -> Vec<String> {
            self.calls()
                .iter()
                .filter_map(|c| c.strip_prefix("revoke:").map(str::to_string))
                .collect()
        }
    }

    #[async_trait]
    impl InviteGateway for FakeGateway {
        async fn create_link(&self, _group: GroupId, label_seed: UserId) -> Result<InviteLink> {
            if self.fail_create.load(Ordering::SeqCst) {
                self.calls.lock().unwrap().push("create-failed".to_string());
                return Err(Error::Upstream("not enough rights".to_string()));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            let link = format!("https://t.me/+u{}n{n}", label_seed.0);
            self.calls.lock().unwrap().push(format!("create:{link}"));
            Ok(InviteLink(link))
        }

        async fn revoke_link(&self, _group: GroupId, link: &InviteLink) -> Result<()> {
            if self.fail_revoke.load(Ordering::SeqCst) {
                self.calls.lock().unwrap().push("revoke-failed".to_string());
                return Err(Error::Upstream("invite link invalid".to_string()));
            }
            self.calls.lock().unwrap().push(format!("revoke:{}", link.0));
            Ok(())
        }
    }

    struct Fixture {
        service: LinkService,
        store: Arc<MemoryLinkStore>,
        gateway: Arc<FakeGateway>,
    }

    fn fixture(directory: FakeDirectory, gateway: FakeGateway) -> Fixture {
        let store = Arc::new(MemoryLinkStore::new());
        let gateway = Arc::new(gateway);
        let service = LinkService::new(
            GROUP,
            Arc::new(directory),
            store.clone(),
            gateway.clone(),
        );
        Fixture {
            service,
            store,
            gateway,
        }
    }

    #[tokio::test]
    async fn ensure_creates_once_then_reuses() {
        let fx = fixture(FakeDirectory::with_members(&[1]), FakeGateway::default());
        let user = UserId(1);

        let link = match fx.service.ensure_link(user).await.unwrap() {
            EnsureOutcome::Created(link) => link,
            other => panic!("expected a created link, got {other:?}"),
        };
        assert_eq!(fx.gateway.created(), 1);

        let second = fx.service.ensure_link(user).await.unwrap();
        assert_eq!(second, EnsureOutcome::Existing(link.clone()));
        // The fast path never calls the gateway again.
        assert_eq!(fx.gateway.created(), 1);
        assert_eq!(fx.store.get(GROUP, user).await.unwrap(), Some(link));
    }

    #[tokio::test]
    async fn ensure_rejects_non_member_without_side_effects() {
        let fx = fixture(FakeDirectory::with_members(&[]), FakeGateway::default());

        let err = fx.service.ensure_link(UserId(7)).await.unwrap_err();
        assert!(matches!(err, Error::NotMember));
        assert!(fx.gateway.calls().is_empty());
        assert_eq!(fx.store.len().await, 0);
    }

    #[tokio::test]
    async fn ensure_persists_nothing_when_create_fails() {
        let fx = fixture(
            FakeDirectory::with_members(&[1]),
            FakeGateway::default().fail_create(),
        );

        let err = fx.service.ensure_link(UserId(1)).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert_eq!(fx.store.len().await, 0);
    }

    #[tokio::test]
    async fn ensure_race_loser_serves_winner_and_revokes_own_link() {
        // A store whose insert always reports a concurrent winner, simulating
        // losing the race between `get` and `put_if_absent`.
        struct RacingStore {
            winner: InviteLink,
        }

        #[async_trait]
        impl LinkStore for RacingStore {
            async fn get(&self, _g: GroupId, _u: UserId) -> Result<Option<InviteLink>> {
                Ok(None)
            }
            async fn put(&self, _g: GroupId, _u: UserId, _l: &InviteLink) -> Result<()> {
                Ok(())
            }
            async fn put_if_absent(
                &self,
                _g: GroupId,
                _u: UserId,
                _l: &InviteLink,
            ) -> Result<Option<InviteLink>> {
                Ok(Some(self.winner.clone()))
            }
            async fn delete(&self, _g: GroupId, _u: UserId) -> Result<()> {
                Ok(())
            }
            async fn list_group(&self, _g: GroupId) -> Result<Vec<(UserId, InviteLink)>> {
                Ok(vec![])
            }
        }

        let winner = InviteLink("https://t.me/+winner".to_string());
        let gateway = Arc::new(FakeGateway::default());
        let service = LinkService::new(
            GROUP,
            Arc::new(FakeDirectory::with_members(&[1])),
            Arc::new(RacingStore {
                winner: winner.clone(),
            }),
            gateway.clone(),
        );

        let out = service.ensure_link(UserId(1)).await.unwrap();
        assert_eq!(out, EnsureOutcome::Existing(winner));
        // The loser's freshly created link was revoked, not leaked.
        assert_eq!(gateway.created(), 1);
        assert_eq!(gateway.revoked().len(), 1);
    }

    #[tokio::test]
    async fn remake_rejects_non_member_without_side_effects() {
        let fx = fixture(FakeDirectory::with_members(&[]), FakeGateway::default());

        let err = fx.service.remake_link(UserId(1)).await.unwrap_err();
        assert!(matches!(err, Error::NotMember));
        assert!(fx.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn remake_without_record_rejects() {
        let fx = fixture(FakeDirectory::with_members(&[1]), FakeGateway::default());

        let err = fx.service.remake_link(UserId(1)).await.unwrap_err();
        assert!(matches!(err, Error::NoExistingLink));
        assert!(fx.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn remake_revokes_old_before_creating_new() {
        let fx = fixture(FakeDirectory::with_members(&[1]), FakeGateway::default());
        let user = UserId(1);
        let old = InviteLink("https://t.me/+old".to_string());
        fx.store.put(GROUP, user, &old).await.unwrap();

        let new = fx.service.remake_link(user).await.unwrap();
        assert_ne!(new, old);

        let calls = fx.gateway.calls();
        assert_eq!(calls[0], "revoke:https://t.me/+old");
        assert!(calls[1].starts_with("create:"));
        assert_eq!(fx.store.get(GROUP, user).await.unwrap(), Some(new));
    }

    #[tokio::test]
    async fn remake_aborts_when_revoke_fails() {
        let fx = fixture(
            FakeDirectory::with_members(&[1]),
            FakeGateway::default().fail_revoke(),
        );
        let user = UserId(1);
        let old = InviteLink("https://t.me/+old".to_string());
        fx.store.put(GROUP, user, &old).await.unwrap();

        let err = fx.service.remake_link(user).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        // Old record intact, no create attempted.
        assert_eq!(fx.store.get(GROUP, user).await.unwrap(), Some(old));
        assert_eq!(fx.gateway.created(), 0);
    }

    #[tokio::test]
    async fn remake_clears_record_when_create_fails_after_revoke() {
        let fx = fixture(
            FakeDirectory::with_members(&[1]),
            FakeGateway::default().fail_create(),
        );
        let user = UserId(1);
        fx.store
            .put(GROUP, user, &InviteLink("https://t.me/+old".to_string()))
            .await
            .unwrap();

        let err = fx.service.remake_link(user).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        // The pair converged to NoLink: the revoked link is not kept around.
        assert_eq!(fx.store.get(GROUP, user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn scan_rejects_non_admin_without_side_effects() {
        let fx = fixture(FakeDirectory::with_members(&[1]), FakeGateway::default());
        fx.store
            .put(GROUP, UserId(1), &InviteLink("a".to_string()))
            .await
            .unwrap();

        let err = fx.service.scan_group(UserId(1)).await.unwrap_err();
        assert!(matches!(err, Error::NotAdmin));
        assert!(fx.gateway.calls().is_empty());
        assert_eq!(fx.store.len().await, 1);
    }

    #[tokio::test]
    async fn scan_leaves_members_untouched() {
        let fx = fixture(
            FakeDirectory::with_members(&[1, 2, 3]).with_admin(9),
            FakeGateway::default(),
        );
        for id in [1, 2, 3] {
            fx.store
                .put(GROUP, UserId(id), &InviteLink(format!("link-{id}")))
                .await
                .unwrap();
        }

        let report = fx.service.scan_group(UserId(9)).await.unwrap();
        assert_eq!(
            report,
            ScanReport {
                checked: 3,
                cleaned: 0,
                revoked: 0
            }
        );
        assert!(fx.gateway.calls().is_empty());
        assert_eq!(fx.store.len().await, 3);
    }

    #[tokio::test]
    async fn scan_cleans_departed_users() {
        // Users 1 and 3 are still members; user 2 left.
        let fx = fixture(
            FakeDirectory::with_members(&[1, 3]).with_admin(9),
            FakeGateway::default(),
        );
        for id in [1, 2, 3] {
            fx.store
                .put(GROUP, UserId(id), &InviteLink(format!("link-{id}")))
                .await
                .unwrap();
        }

        let report = fx.service.scan_group(UserId(9)).await.unwrap();
        assert_eq!(
            report,
            ScanReport {
                checked: 3,
                cleaned: 1,
                revoked: 1
            }
        );
        assert_eq!(fx.gateway.revoked(), vec!["link-2".to_string()]);
        assert_eq!(fx.store.get(GROUP, UserId(2)).await.unwrap(), None);
        assert_eq!(fx.store.len().await, 2);
    }

    #[tokio::test]
    async fn scan_deletes_record_even_when_revoke_fails() {
        let fx = fixture(
            FakeDirectory::with_members(&[]).with_admin(9),
            FakeGateway::default().fail_revoke(),
        );
        fx.store
            .put(GROUP, UserId(1), &InviteLink("dead".to_string()))
            .await
            .unwrap();

        let report = fx.service.scan_group(UserId(9)).await.unwrap();
        assert_eq!(
            report,
            ScanReport {
                checked: 1,
                cleaned: 1,
                revoked: 0
            }
        );
        assert_eq!(fx.store.len().await, 0);
    }

    #[tokio::test]
    async fn rerunning_scan_converges() {
        let fx = fixture(
            FakeDirectory::with_members(&[1]).with_admin(9),
            FakeGateway::default(),
        );
        fx.store
            .put(GROUP, UserId(1), &InviteLink("keep".to_string()))
            .await
            .unwrap();
        fx.store
            .put(GROUP, UserId(2), &InviteLink("drop".to_string()))
            .await
            .unwrap();

        let first = fx.service.scan_group(UserId(9)).await.unwrap();
        assert_eq!(first.cleaned, 1);

        let second = fx.service.scan_group(UserId(9)).await.unwrap();
        assert_eq!(
            second,
            ScanReport {
                checked: 1,
                cleaned: 0,
                revoked: 0
            }
        );
    }
}
