//! 제네릭 의존성 그래프
//!
//! [`Identify`]를 구현하는 임의 노드 타입 위의 방향 그래프입니다.
//! 간선은 의존 방향(의존하는 쪽 -> 의존 대상)을 따르며, 노드 추가는
//! 멱등입니다. 순환이 들어와도 거부하지 않고 역방향 추적 시 방문
//! 집합으로 안전하게 탐색합니다.
//!
//! JSON 스냅샷은 `{present, nodes: {id: {data, children, root}}}` 형태로
//! 직렬화되며 손실 없이 복원됩니다.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::Identify;

/// 그래프 노드 (데이터 + 자식 목록 + 루트 표시)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GraphNode<T> {
    data: T,
    children: Vec<T>,
    root: bool,
}

/// 방향 의존성 그래프
///
/// `present` 플래그는 구조(간선) 정보가 신뢰 가능한지를 나타냅니다.
/// 간선 정보 없이 노드만 쌓인 그래프를 구조적 사실로 오해하지 않도록,
/// 구조를 채운 쪽이 명시적으로 켜야 합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph<T> {
    present: bool,
    nodes: BTreeMap<String, GraphNode<T>>,
}

impl<T: Identify + Clone> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DependencyGraph<T>
where
    T: Identify + Clone,
{
    /// 빈 그래프를 생성합니다.
    pub fn new() -> Self {
        Self {
            present: false,
            nodes: BTreeMap::new(),
        }
    }

    /// 구조 정보 신뢰 플래그를 반환합니다.
    pub fn present(&self) -> bool {
        self.present
    }

    /// 구조 정보 신뢰 플래그를 설정합니다.
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// 모든 노드와 플래그를 제거합니다.
    pub fn clear(&mut self) {
        self.present = false;
        self.nodes.clear();
    }

    /// 노드를 추가합니다.
    ///
    /// 같은 식별자의 노드가 이미 있으면 기존 데이터와 루트 표시를
    /// 유지합니다.
    pub fn add_node(&mut self, data: T) {
        let id = data.id();
        self.nodes.entry(id).or_insert(GraphNode {
            data,
            children: Vec::new(),
            root: false,
        });
    }

    /// 루트로 표시된 노드를 추가합니다.
    ///
    /// 이미 존재하는 노드라면 루트 표시만 켭니다.
    pub fn add_root_node(&mut self, data: T) {
        let id = data.id();
        self.nodes
            .entry(id)
            .and_modify(|n| n.root = true)
            .or_insert(GraphNode {
                data,
                children: Vec::new(),
                root: true,
            });
    }

    /// 노드가 루트로 표시되어 있는지 반환합니다.
    ///
    /// 그래프에 없는 노드는 false입니다.
    pub fn is_root(&self, node: &T) -> bool {
        self.nodes.get(&node.id()).is_some_and(|n| n.root)
    }

    /// 노드의 루트 표시를 바꿉니다. 없는 노드면 아무 일도 하지 않습니다.
    pub fn set_root(&mut self, node: &T, root: bool) {
        if let Some(n) = self.nodes.get_mut(&node.id()) {
            n.root = root;
        }
    }

    /// `from -> to` 의존 간선을 추가합니다.
    ///
    /// 양쪽 노드가 없으면 먼저 등록합니다. 간선 중복 검사는 하지
    /// 않으므로 같은 간선을 두 번 넣지 않는 것은 호출자의 몫입니다.
    pub fn add_dependency(&mut self, from: &T, to: &T) {
        self.add_node(from.clone());
        self.add_node(to.clone());

        if let Some(node) = self.nodes.get_mut(&from.id()) {
            node.children.push(to.clone());
        }
    }

    /// 노드가 직접 의존하는 대상들을 반환합니다.
    pub fn dependencies(&self, node: &T) -> Vec<T> {
        self.nodes
            .get(&node.id())
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// 노드에 직접 의존하는 쪽(역방향 이웃)들을 반환합니다.
    ///
    /// 식별자 오름차순으로 정렬되어 결정적입니다.
    pub fn dependents(&self, node: &T) -> Vec<T> {
        let id = node.id();
        self.nodes
            .values()
            .filter(|n| n.children.iter().any(|c| c.id() == id))
            .map(|n| n.data.clone())
            .collect()
    }

    /// 노드에서 루트까지의 역방향 경로 하나를 반환합니다.
    ///
    /// 시작 노드를 포함하며, 각 단계에서 역방향 이웃 중 식별자가 가장
    /// 작은 미방문 노드를 선택하므로 항상 결정적입니다. 루트로 표시된
    /// 노드에 닿거나 더 올라갈 곳이 없으면 멈추고, 방문 집합이 순환을
    /// 차단합니다. 노드가 그래프에 없으면 빈 경로를 반환합니다.
    pub fn path_to_root(&self, node: &T) -> Vec<T> {
        let start_id = node.id();
        let Some(start) = self.nodes.get(&start_id) else {
            return Vec::new();
        };

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start_id.clone());

        let mut path = vec![start.data.clone()];
        let mut current_id = start_id;

        while !self.nodes[&current_id].root {
            // BTreeMap 순회는 식별자 오름차순이므로 첫 매치가 최소값
            let next = self.nodes.iter().find(|(id, n)| {
                !visited.contains(*id) && n.children.iter().any(|c| c.id() == current_id)
            });

            let Some((id, n)) = next else {
                break;
            };

            visited.insert(id.clone());
            path.push(n.data.clone());
            current_id = id.clone();
        }

        path
    }

    /// 모든 노드 데이터를 식별자 오름차순으로 반환합니다.
    pub fn nodes(&self) -> Vec<T> {
        self.nodes.values().map(|n| n.data.clone()).collect()
    }

    /// 노드 수를 반환합니다.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// 식별자가 일치하는 노드의 데이터를 교체합니다.
    ///
    /// 간선과 루트 표시는 그대로 유지됩니다. 노드가 없으면 아무 일도
    /// 하지 않습니다.
    pub(crate) fn set_node_data(&mut self, id: &str, data: T) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.data = data;
        }
    }
}
