use super::*;

use std::collections::HashMap;

use tokio::sync::oneshot;

/// Producer whose result for each dep is released by the test.
#[derive(Clone, Default)]
struct Gates {
    pending: Arc<Mutex<HashMap<u32, oneshot::Receiver<Result<u32, ClientError>>>>>,
}

impl Gates {
    fn open(&self, dep: u32) -> oneshot::Sender<Result<u32, ClientError>> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(dep, rx);
        tx
    }

    fn resource(&self) -> Resource<u32, u32> {
        let gates = self.clone();
        Resource::new(move |dep: u32| {
            let rx = gates.pending.lock().unwrap().remove(&dep);
            async move {
                match rx {
                    Some(rx) => rx.await.unwrap_or_else(|_| Err(ClientError::Network("dropped".into()))),
                    None => Ok(dep * 10),
                }
            }
        })
    }
}

fn assert_invariant<T>(state: &FetchState<T>) {
    if state.loading() {
        assert!(state.error().is_none(), "loading with an error set");
    }
}

// =============================================================
// ordering
// =============================================================

#[tokio::test]
async fn later_deps_win_even_when_earlier_resolves_last() {
    let gates = Gates::default();
    let tx1 = gates.open(1);
    let tx2 = gates.open(2);
    let resource = gates.resource();

    let first = resource.set_deps(1).unwrap();
    let second = resource.set_deps(2).unwrap();

    tx2.send(Ok(20)).unwrap();
    assert!(second.await.unwrap());
    assert_eq!(resource.state().data(), Some(&20));

    tx1.send(Ok(10)).unwrap();
    assert!(!first.await.unwrap());

    let state = resource.state();
    assert_eq!(state.data(), Some(&20));
    assert!(!state.loading());
    assert_invariant(&state);
}

#[tokio::test]
async fn stale_error_never_overwrites_fresh_data() {
    let gates = Gates::default();
    let tx1 = gates.open(1);
    let resource = gates.resource();

    let first = resource.set_deps(1).unwrap();
    let second = resource.set_deps(2).unwrap();
    assert!(second.await.unwrap());

    tx1.send(Err(ClientError::Api { status: 500, message: "boom".into() })).unwrap();
    assert!(!first.await.unwrap());
    assert_eq!(resource.state().error(), None);
    assert_eq!(resource.state().data(), Some(&20));
}

#[tokio::test]
async fn many_dep_changes_commit_only_the_last() {
    let gates = Gates::default();
    let senders: Vec<_> = (1..=5).map(|d| gates.open(d)).collect();
    let resource = gates.resource();
    let handles: Vec<_> = (1..=5).map(|d| resource.set_deps(d).unwrap()).collect();

    for (i, tx) in senders.into_iter().enumerate().rev() {
        let dep = u32::try_from(i).unwrap() + 1;
        tx.send(Ok(dep * 100)).unwrap();
    }
    let committed: Vec<bool> = futures::future::join_all(handles).await.into_iter().map(Result::unwrap).collect();
    assert_eq!(committed, vec![false, false, false, false, true]);
    assert_eq!(resource.state().data(), Some(&500));
}

// =============================================================
// state transitions
// =============================================================

#[tokio::test]
async fn set_deps_marks_loading_then_commits() {
    let gates = Gates::default();
    let tx = gates.open(3);
    let resource = gates.resource();

    let handle = resource.set_deps(3).unwrap();
    let loading = resource.state();
    assert!(loading.loading());
    assert_eq!(loading.data(), None);
    assert_invariant(&loading);

    tx.send(Ok(33)).unwrap();
    assert!(handle.await.unwrap());
    let done = resource.state();
    assert!(!done.loading());
    assert_eq!(done.data(), Some(&33));
}

#[tokio::test]
async fn equal_deps_do_not_reload() {
    let resource = Gates::default().resource();
    assert!(resource.set_deps(1).unwrap().await.unwrap());
    assert!(resource.set_deps(1).is_none());
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let resource: Resource<(), u32> =
        Resource::new(|()| async { Err(ClientError::Api { status: 404, message: "Post not found".into() }) });
    assert!(resource.set_deps(()).unwrap().await.unwrap());
    let state = resource.state();
    assert_eq!(state.error(), Some("Post not found"));
    assert!(!state.loading());
    assert_eq!(state.data(), None);
}

#[tokio::test]
async fn other_errors_are_generic() {
    let resource: Resource<(), u32> = Resource::new(|()| async { Err(ClientError::Network("reset".into())) });
    assert!(resource.set_deps(()).unwrap().await.unwrap());
    assert_eq!(resource.state().error(), Some("An error occurred"));
}

#[tokio::test]
async fn reload_clears_error_and_keeps_previous_data() {
    let gates = Gates::default();
    let tx = gates.open(2);
    let resource = gates.resource();
    assert!(resource.set_deps(1).unwrap().await.unwrap());

    let handle = resource.set_deps(2).unwrap();
    let state = resource.state();
    assert!(state.loading());
    assert_eq!(state.data(), Some(&10));

    tx.send(Err(ClientError::Api { status: 503, message: "Maintenance".into() })).unwrap();
    assert!(handle.await.unwrap());
    assert_eq!(resource.state().error(), Some("Maintenance"));

    let handle = resource.refetch().unwrap();
    assert_eq!(resource.state().error(), None);
    assert!(handle.await.unwrap());
    assert_eq!(resource.state().data(), Some(&20));
}

// =============================================================
// refetch
// =============================================================

#[tokio::test]
async fn refetch_before_any_deps_is_none() {
    let resource = Gates::default().resource();
    assert!(resource.refetch().is_none());
}

#[tokio::test]
async fn refetch_is_superseded_by_dep_change() {
    let gates = Gates::default();
    let resource = gates.resource();
    assert!(resource.set_deps(1).unwrap().await.unwrap());

    let tx = gates.open(1);
    let refetch = resource.refetch().unwrap();
    let change = resource.set_deps(4).unwrap();
    assert!(change.await.unwrap());

    tx.send(Ok(999)).unwrap();
    assert!(!refetch.await.unwrap());
    assert_eq!(resource.state().data(), Some(&40));
}

// =============================================================
// teardown
// =============================================================

#[tokio::test]
async fn teardown_discards_in_flight_results() {
    let gates = Gates::default();
    let tx = gates.open(1);
    let resource = gates.resource();
    let mut rx = resource.subscribe();

    let handle = resource.set_deps(1).unwrap();
    resource.teardown();
    tx.send(Ok(10)).unwrap();

    assert!(!handle.await.unwrap());
    assert!(resource.is_torn_down());
    assert_eq!(rx.borrow_and_update().data(), None);
    assert!(resource.set_deps(2).is_none());
    assert!(resource.refetch().is_none());
}

#[tokio::test]
async fn dropping_the_resource_discards_results() {
    let gates = Gates::default();
    let tx = gates.open(1);
    let resource = gates.resource();
    let rx = resource.subscribe();

    let handle = resource.set_deps(1).unwrap();
    drop(resource);
    tx.send(Ok(10)).unwrap();

    assert!(!handle.await.unwrap());
    assert_eq!(rx.borrow().data(), None);
}

// =============================================================
// run_mutation
// =============================================================

#[tokio::test]
async fn run_mutation_maps_errors_to_messages() {
    assert_eq!(run_mutation(async { Ok::<_, ClientError>(5) }).await, Ok(5));
    let err = run_mutation(async { Err::<(), _>(ClientError::Api { status: 409, message: "Slug taken".into() }) }).await;
    assert_eq!(err, Err("Slug taken".to_owned()));
    let err = run_mutation(async { Err::<(), _>(ClientError::Network("x".into())) }).await;
    assert_eq!(err, Err("An error occurred".to_owned()));
}
