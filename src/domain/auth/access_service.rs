use tracing::warn;

use crate::core::client::cluster_client::Verb;
use crate::core::client::gvr::Gvr;
use crate::core::watch::Factory;
use crate::errors::DaoError;

/// Ask the access-review API whether every verb is allowed; a denial becomes
/// `Forbidden("user is not authorized to {action}")`.
///
/// Never cached: permissions can change between two calls.
pub async fn ensure_authorized(
    factory: &Factory,
    namespace: Option<&str>,
    gvr: &Gvr,
    verbs: &[Verb],
    action: &str,
) -> Result<(), DaoError> {
    let allowed = factory.can_i(namespace, gvr, verbs).await?;
    if !allowed {
        warn!(gvr = %gvr, namespace = ?namespace, ?verbs, "Denied: {action}");
        return Err(DaoError::Forbidden(format!("user is not authorized to {action}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactoryConfig;
    use crate::core::client::fake::FakeCluster;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn allowed_passes_through() {
        let fake = FakeCluster::new();
        let factory = Factory::new(fake.clone(), FactoryConfig::default());
        let gvr = Gvr::new("apps", "v1", "daemonsets");

        ensure_authorized(&factory, Some("kube-system"), &gvr, &[Verb::Patch], "restart a daemonset")
            .await
            .unwrap();

        let reviews = fake.reviews.lock().unwrap();
        assert_eq!(
            reviews[0],
            (Some("kube-system".to_string()), "apps/v1/daemonsets".to_string(), vec![Verb::Patch])
        );
    }

    #[tokio::test]
    async fn denial_is_forbidden_not_transport() {
        let fake = FakeCluster::new();
        fake.deny_all();
        let factory = Factory::new(fake.clone(), FactoryConfig::default());

        let err = ensure_authorized(&factory, None, &Gvr::pods(), &[Verb::Delete], "delete a pod")
            .await
            .unwrap_err();

        assert!(err.is_forbidden());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Forbidden: user is not authorized to delete a pod");
    }

    #[tokio::test]
    async fn every_call_asks_again() {
        let fake = FakeCluster::new();
        let factory = Factory::new(fake.clone(), FactoryConfig::default());

        for _ in 0..3 {
            ensure_authorized(&factory, None, &Gvr::pods(), &[Verb::Get], "read pods").await.unwrap();
        }
        assert_eq!(fake.can_i_calls.load(Ordering::SeqCst), 3);
    }
}
