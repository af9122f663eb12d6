//! Launcher behavior that the binary's exit code intentionally hides:
//! per-process statuses inside a job.
//!
//! Kept as a single test function: the wait loop reaps any child of this
//! process, so concurrently launched jobs would steal each other's children.

use minish::job::{self, Status};
use minish::parser;
use nix::sys::signal::Signal;

fn launch(input: &str) -> job::Job {
    let pipeline = parser::parse(input).expect("parse");
    job::run("minish-test", &pipeline, None).expect("launch")
}

#[test]
fn statuses_are_recorded_per_process() {
    let job = launch("true | false");
    assert_eq!(job.procs.len(), 2);
    assert_eq!(job.procs[0].status, Status::Exited(0));
    assert_eq!(job.procs[1].status, Status::Exited(1));
    assert_eq!(job.last_status(), 1);

    let job = launch("sh -c 'exit 7'");
    assert_eq!(job.procs[0].status, Status::Exited(7));

    // a child killed by a signal records 128+N
    let job = launch("sh -c 'kill -TERM $$'");
    assert_eq!(job.procs[0].status, Status::Signaled(Signal::SIGTERM));
    assert_eq!(job.last_status(), 143);

    // assignments alone have nothing to exec
    let pipeline = parser::parse("ONLY=assignments").expect("parse");
    let err = job::run("minish-test", &pipeline, None).unwrap_err();
    assert!(err.to_string().contains("missing command name"));
}
