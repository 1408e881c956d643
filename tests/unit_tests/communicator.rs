use fenris_vector_tools::communicator::{Communicator, LocalCommunicator, ReduceOp, SerialCommunicator};
use util::run_concurrently;

#[test]
fn serial_communicator_returns_its_input() {
    let comm = SerialCommunicator;
    assert_eq!(comm.rank(), 0);
    assert_eq!(comm.size(), 1);
    assert_eq!(comm.all_reduce(2.5, ReduceOp::Sum), 2.5);
    assert_eq!(comm.all_reduce(-1.0f32, ReduceOp::Max), -1.0);
}

#[test]
fn reduce_op_apply() {
    assert_eq!(ReduceOp::Sum.apply(1.0, 2.0), 3.0);
    assert_eq!(ReduceOp::Max.apply(1.0, 2.0), 2.0);
    assert_eq!(ReduceOp::Min.apply(1.0, 2.0), 1.0);
    assert!(ReduceOp::Max.apply(f64::NAN, 2.0).is_nan());
    assert!(ReduceOp::Max.apply(2.0, f64::NAN).is_nan());
    assert!(ReduceOp::Min.apply(1.0, f64::NAN).is_nan());
}

#[test]
fn local_communicator_reductions_across_ranks() {
    let num_ranks = 4;
    let comms = LocalCommunicator::create(num_ranks);
    let results = run_concurrently(num_ranks, |rank| {
        let comm = &comms[rank];
        assert_eq!(comm.rank(), rank);
        assert_eq!(comm.size(), num_ranks);
        let value = rank as f64 + 1.0;
        (
            comm.all_reduce(value, ReduceOp::Sum),
            comm.all_reduce(value, ReduceOp::Max),
            comm.all_reduce(value, ReduceOp::Min),
        )
    });
    for result in results {
        assert_eq!(result, (10.0, 4.0, 1.0));
    }
}

#[test]
fn local_communicator_supports_repeated_reductions() {
    let num_ranks = 3;
    let comms = LocalCommunicator::create(num_ranks);
    let results = run_concurrently(num_ranks, |rank| {
        let comm = &comms[rank];
        let mut total = 0.0;
        for round in 0..50 {
            total += comm.all_reduce((rank * round) as f64, ReduceOp::Sum);
        }
        total
    });
    // Sum over rounds of round * (0 + 1 + 2)
    let expected = 3.0 * (0..50).sum::<usize>() as f64;
    for total in results {
        assert_eq!(total, expected);
    }
}

#[test]
fn local_communicator_with_single_rank() {
    let comms = LocalCommunicator::create(1);
    assert_eq!(comms.len(), 1);
    assert_eq!(comms[0].all_reduce(7.0, ReduceOp::Sum), 7.0);
    assert_eq!(comms[0].all_reduce(7.0, ReduceOp::Min), 7.0);
}
