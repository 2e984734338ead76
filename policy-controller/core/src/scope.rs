use crate::registry::ScopeAxis;

/// A concrete sub-region of a target at which one policy configuration
/// applies.
///
/// Route matches are keyed by their canonical JSON rendering (object keys
/// sorted), so that two structurally equal matches produce the same scope
/// regardless of field order in the original manifests.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Scope {
    WholeTarget,
    Port(u16),
    Hostname(String),
    HttpRouteMatch(String),
    GrpcRouteMatch(String),
    ServicePort(u16),
}

impl Scope {
    pub fn axis(&self) -> ScopeAxis {
        match self {
            Scope::WholeTarget => ScopeAxis::WholeTarget,
            Scope::Port(_) => ScopeAxis::Port,
            Scope::Hostname(_) => ScopeAxis::Hostname,
            Scope::HttpRouteMatch(_) => ScopeAxis::HttpRouteMatch,
            Scope::GrpcRouteMatch(_) => ScopeAxis::GrpcRouteMatch,
            Scope::ServicePort(_) => ScopeAxis::ServicePort,
        }
    }

    /// More specific scopes shadow less specific ones on the same target:
    /// RouteMatch > Hostname > Port > ServicePort > WholeTarget.
    pub fn specificity(&self) -> u8 {
        match self {
            Scope::HttpRouteMatch(_) | Scope::GrpcRouteMatch(_) => 4,
            Scope::Hostname(_) => 3,
            Scope::Port(_) => 2,
            Scope::ServicePort(_) => 1,
            Scope::WholeTarget => 0,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::WholeTarget => write!(f, "target"),
            Scope::Port(p) => write!(f, "port {p}"),
            Scope::Hostname(h) => write!(f, "hostname {h}"),
            Scope::HttpRouteMatch(m) => write!(f, "HTTP route match {m}"),
            Scope::GrpcRouteMatch(m) => write!(f, "gRPC route match {m}"),
            Scope::ServicePort(p) => write!(f, "service port {p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specificity_ordering() {
        let whole = Scope::WholeTarget;
        let port = Scope::Port(80);
        let svc_port = Scope::ServicePort(8080);
        let hostname = Scope::Hostname("api.example.com".to_string());
        let http = Scope::HttpRouteMatch(r#"{"path":{"type":"Exact","value":"/v1"}}"#.to_string());

        assert!(http.specificity() > hostname.specificity());
        assert!(hostname.specificity() > port.specificity());
        assert!(port.specificity() > svc_port.specificity());
        assert!(svc_port.specificity() > whole.specificity());
    }

    #[test]
    fn scopes_with_equal_values_are_equal() {
        assert_eq!(Scope::Port(80), Scope::Port(80));
        assert_ne!(Scope::Port(80), Scope::ServicePort(80));
        assert_eq!(
            Scope::Hostname("a.example.com".into()),
            Scope::Hostname("a.example.com".into()),
        );
    }
}
