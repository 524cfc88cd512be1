//! End-to-end search scenarios.

use engine_core::Position;
use games_tictactoe::{Cell, TicTacToe};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::config::MctsConfig;
use crate::diagnostics::dump;
use crate::evaluator::UniformEvaluator;
use crate::node::NodeId;
use crate::policy::MoveChoice;
use crate::search::{MctsSearch, StopReason};
use crate::stop::StopToken;
use crate::test_utils::{Branching, MockEvaluator};
use crate::tree::MctsTree;

fn search<P: Position, E: crate::Evaluator>(
    search: &mut MctsSearch<P>,
    position: &P,
    evaluator: &E,
    config: &MctsConfig,
    seed: u64,
) -> NodeId {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    search
        .run(position, evaluator, config, &mut rng, &StopToken::new())
        .unwrap()
}

fn child_visits<P: Position>(tree: &MctsTree<P>, node: NodeId) -> Vec<u32> {
    tree.children_of(node)
        .iter()
        .map(|&c| tree.get(c).visit_count)
        .collect()
}

fn tictactoe_evaluator() -> UniformEvaluator {
    UniformEvaluator::new(TicTacToe::policy_size())
}

#[test]
fn test_symmetric_exploration_under_tied_priors() {
    let mut mcts = MctsSearch::with_capacity(10_000);
    let pos = Branching::new(3, 12);
    // Raw 0.0 maps to 0.5 everywhere
    let eval = MockEvaluator::uniform(0.0);
    let config = MctsConfig::for_testing()
        .with_simulations(30)
        .with_batch_size(1);

    let root = search(&mut mcts, &pos, &eval, &config, 0);
    let visits = child_visits(mcts.tree(), root);

    assert_eq!(visits.iter().sum::<u32>(), 30);
    let max = *visits.iter().max().unwrap();
    let min = *visits.iter().min().unwrap();
    assert!(max - min <= 1, "visits {:?}", visits);
}

#[test]
fn test_visit_conservation_and_virtual_loss_cleared() {
    let mut mcts = MctsSearch::with_capacity(1 << 16);
    let pos = TicTacToe::new();
    let config = MctsConfig::for_testing()
        .with_simulations(96)
        .with_batch_size(8);

    let root = search(&mut mcts, &pos, &tictactoe_evaluator(), &config, 7);
    let tree = mcts.tree();

    assert_eq!(mcts.stats().rounds, 12);
    assert_eq!(tree.get(root).visit_count, 1 + 96);
    assert_eq!(child_visits(tree, root).iter().sum::<u32>(), 96);
    assert_eq!(tree.get_playouts(root, false), 96);
    for id in tree.subtree(root) {
        assert_eq!(tree.get(id).virtual_loss, 0);
    }
}

#[test]
fn test_search_is_deterministic_for_a_seed() {
    let pos = TicTacToe::from_moves(&[4]).unwrap();
    let config = MctsConfig::for_training()
        .with_simulations(128)
        .with_batch_size(4);
    let eval = tictactoe_evaluator();

    let mut a = MctsSearch::with_capacity(1 << 16);
    let mut b = MctsSearch::with_capacity(1 << 16);
    let root_a = search(&mut a, &pos, &eval, &config, 99);
    let root_b = search(&mut b, &pos, &eval, &config, 99);

    assert_eq!(a.dump(root_a, &config, false), b.dump(root_b, &config, false));
    assert_eq!(a.best_move(root_a), b.best_move(root_b));
}

#[test]
fn test_dirichlet_noise_changes_root_priors() {
    let pos = TicTacToe::new();
    let config = MctsConfig::for_testing()
        .with_simulations(0)
        .with_dirichlet(0.3, 0.25);

    let mut mcts = MctsSearch::with_capacity(1 << 10);
    let root = search(&mut mcts, &pos, &tictactoe_evaluator(), &config, 5);
    let tree = mcts.tree();

    let priors: Vec<f32> = tree
        .children_of(root)
        .iter()
        .map(|&c| tree.get(c).prior)
        .collect();
    assert!((priors.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    assert!(priors.iter().any(|&p| (p - 1.0 / 9.0).abs() > 1e-4));
    // Noise never removes more than `frac` of a prior
    assert!(priors.iter().all(|&p| p >= 0.75 / 9.0 - 1e-6));
}

#[test]
fn test_round_skipped_when_memory_exhausted() {
    // Root plus its 9 children fill the budget
    let mut mcts = MctsSearch::with_capacity(10);
    let pos = TicTacToe::new();
    let eval = MockEvaluator::new(vec![1.0 / 9.0; 9], 0.0);
    let config = MctsConfig::for_testing()
        .with_simulations(8)
        .with_batch_size(8);

    let root = search(&mut mcts, &pos, &eval, &config, 0);
    let tree = mcts.tree();

    assert_eq!(tree.get(root).visit_count, 1);
    assert_eq!(tree.len(), 10);
    assert!(child_visits(tree, root).iter().all(|&n| n == 0));
    assert_eq!(mcts.stats().stop_reason, StopReason::MemoryLimit);
    assert_eq!(mcts.stats().rounds, 0);
    assert_eq!(eval.calls(), 1);
}

#[test]
fn test_terminal_leaves_bypass_evaluator() {
    let mut mcts = MctsSearch::with_capacity(100);
    // Every reply ends the game: the side to move then has no moves and loses
    let pos = Branching::new(2, 1);
    let eval = MockEvaluator::uniform(0.0);
    let config = MctsConfig::for_testing()
        .with_simulations(4)
        .with_batch_size(2);

    let root = search(&mut mcts, &pos, &eval, &config, 0);
    let tree = mcts.tree();

    assert_eq!(eval.calls(), 1, "only the root is evaluated");
    assert_eq!(mcts.stats().terminal_hits, 4);
    for &child in tree.children_of(root) {
        let node = tree.get(child);
        assert!(node.is_terminal);
        assert_eq!(node.value, 0.0);
        assert_eq!(node.visit_count, 2);
    }
    // 0.5 from the root evaluation plus four wins
    assert!((tree.get(root).value_sum - 4.5).abs() < 1e-6);
}

#[test]
fn test_finds_immediate_win() {
    // X: 0, 1   O: 3, 4   X to move wins on 2
    let pos = TicTacToe::from_moves(&[0, 3, 1, 4]).unwrap();
    for batch_size in [1, 8] {
        let mut mcts = MctsSearch::with_capacity(1 << 16);
        let config = MctsConfig::for_testing()
            .with_simulations(200)
            .with_batch_size(batch_size);

        let root = search(&mut mcts, &pos, &tictactoe_evaluator(), &config, 3);
        assert_eq!(
            mcts.best_move(root),
            MoveChoice::Normal(Cell(2)),
            "batch size {}",
            batch_size
        );
        let info = mcts.info(root);
        assert!(info.winrate > 0.9, "{}", info);
        assert_eq!(info.pv.first().map(String::as_str), Some("2"));
    }
}

#[test]
fn test_blocks_opponent_threat() {
    // X: 0, 8   O: 4, 1   X must block 7
    let pos = TicTacToe::from_moves(&[0, 4, 8, 1]).unwrap();
    let mut mcts = MctsSearch::with_capacity(1 << 16);
    let config = MctsConfig::for_testing()
        .with_simulations(800)
        .with_batch_size(8);

    let root = search(&mut mcts, &pos, &tictactoe_evaluator(), &config, 11);
    assert_eq!(mcts.best_move(root), MoveChoice::Normal(Cell(7)));
}

#[test]
fn test_tree_reuse_across_moves() {
    let mut mcts = MctsSearch::with_capacity(1 << 16);
    let pos = TicTacToe::new();
    let eval = tictactoe_evaluator();
    let config = MctsConfig::for_testing()
        .with_simulations(160)
        .with_batch_size(8)
        .with_reuse_tree(true);

    let root = search(&mut mcts, &pos, &eval, &config, 1);
    let mv = mcts.best_move(root).mv().unwrap();
    let child = mcts.tree().find_child(root, mv).unwrap();
    let carried = mcts.tree().get(child).visit_count;
    assert!(carried > 1);

    let next = pos.apply(mv);
    let new_root = search(&mut mcts, &next, &eval, &config, 2);

    assert_eq!(new_root, child);
    assert!(mcts.tree().get(new_root).parent.is_none());
    assert_eq!(mcts.tree().get(new_root).visit_count, carried + 160);

    // A position that does not follow from the stored root starts over
    let unrelated = TicTacToe::from_moves(&[4, 0, 8]).unwrap();
    let fresh = search(&mut mcts, &unrelated, &eval, &config, 3);
    assert_eq!(mcts.tree().get(fresh).visit_count, 1 + 160);
}

#[test]
fn test_forced_playouts_are_tagged_at_root_only() {
    let mut mcts = MctsSearch::with_capacity(1 << 16);
    let pos = TicTacToe::new();
    let config = MctsConfig::for_testing()
        .with_simulations(200)
        .with_batch_size(1)
        .with_forced_playouts(true);

    let root = search(&mut mcts, &pos, &tictactoe_evaluator(), &config, 0);
    let tree = mcts.tree();

    let root_children = tree.children_of(root).to_vec();
    let forced: u32 = root_children
        .iter()
        .map(|&c| tree.get(c).forced_visits)
        .sum();
    assert!(forced >= 9, "every child's first visit is forced");
    for &c in &root_children {
        let node = tree.get(c);
        assert!(node.forced_visits <= node.visit_count);
    }
    for id in tree.subtree(root) {
        if id != root && !root_children.contains(&id) {
            assert_eq!(tree.get(id).forced_visits, 0);
        }
    }
}

#[test]
fn test_forced_playouts_apply_below_root() {
    let mut mcts = MctsSearch::with_capacity(1 << 16);
    let pos = TicTacToe::new();
    // Nearly all prior mass on one cell, so PUCT alone would starve the rest
    let mut policy = vec![0.01; 9];
    policy[0] = 0.92;
    let eval = MockEvaluator::new(policy, 0.0);
    let config = MctsConfig::for_testing()
        .with_simulations(300)
        .with_batch_size(1)
        .with_forced_playouts(true);

    let root = search(&mut mcts, &pos, &eval, &config, 0);
    let tree = mcts.tree();

    // Unvisited children are always owed a playout, so a node passed through
    // a few times per child has visited all of them
    let mut checked = 0;
    for id in tree.subtree(root) {
        let node = tree.get(id);
        let children = tree.children_of(id);
        if id == root || children.is_empty() {
            continue;
        }
        if node.visit_count as usize > 4 * children.len() + 1 {
            checked += 1;
            assert!(
                child_visits(tree, id).iter().all(|&n| n > 0),
                "node {:?} has an unvisited child",
                id
            );
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_target_pruning_in_dump() {
    let mut mcts = MctsSearch::with_capacity(1 << 16);
    let pos = TicTacToe::from_moves(&[0, 3, 1, 4]).unwrap();
    let config = MctsConfig::for_training()
        .with_simulations(200)
        .with_batch_size(4);

    let root = search(&mut mcts, &pos, &tictactoe_evaluator(), &config, 8);
    let tree = mcts.tree();

    let raw = dump(tree, root, &config.clone().with_target_pruning(false), false);
    let pruned = dump(tree, root, &config, false);

    assert_eq!(raw.sum_visits, 200);
    assert!(pruned.sum_visits <= raw.sum_visits);
    assert_eq!(raw.q, pruned.q);

    let best = mcts.best_move(root).mv().unwrap().to_string();
    for (((mv, n_raw), (_, n_pruned)), &child) in raw
        .distribution
        .iter()
        .zip(&pruned.distribution)
        .zip(tree.children_of(root))
    {
        if *mv == best {
            assert_eq!(n_raw, n_pruned);
        }
        assert!(n_pruned <= n_raw);
        assert!(*n_pruned >= n_raw - tree.get(child).forced_visits);
    }
    // Pruning is a view: the tree keeps its counts
    assert_eq!(child_visits(tree, root).iter().sum::<u32>(), 200);
}

#[test]
fn test_terminal_position_resigns() {
    // X wins on the top row; O to move
    let pos = TicTacToe::from_moves(&[0, 3, 1, 4, 2]).unwrap();
    let mut mcts = MctsSearch::with_capacity(100);
    let eval = MockEvaluator::new(vec![1.0 / 9.0; 9], 0.0);

    let root = search(&mut mcts, &pos, &eval, &MctsConfig::for_testing(), 0);
    assert_eq!(mcts.best_move(root), MoveChoice::Resign);
    assert_eq!(mcts.stats().stop_reason, StopReason::TerminalRoot);
    assert_eq!(eval.calls(), 0);
}

#[test]
fn test_softmax_sample_follows_searched_visits() {
    let mut mcts = MctsSearch::with_capacity(1 << 16);
    let pos = TicTacToe::from_moves(&[0, 3, 1, 4]).unwrap();
    let config = MctsConfig::for_testing()
        .with_simulations(400)
        .with_batch_size(8);
    let root = search(&mut mcts, &pos, &tictactoe_evaluator(), &config, 4);

    let mut rng = ChaCha20Rng::seed_from_u64(17);
    let wins = (0..1000)
        .filter(|_| mcts.softmax_sample(root, 1.0, &mut rng) == MoveChoice::Normal(Cell(2)))
        .count();
    let share = mcts.tree().get(mcts.tree().find_child(root, Cell(2)).unwrap()).visit_count
        as f64
        / 400.0;
    assert!((wins as f64 / 1000.0 - share).abs() < 0.06);
}
