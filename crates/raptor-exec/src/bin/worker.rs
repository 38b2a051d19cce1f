// Child executable spawned by the supervisor, one process per test case.
// Payload on stdin, reply on stdout; see raptor_exec::worker.

fn main() {
    raptor_exec::worker_main();
}
