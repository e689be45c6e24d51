use alloy::sol;

// Compound v2 Comptroller
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface ComptrollerContract {
        function getAccountLiquidity(address account) external view returns (uint256 err, uint256 liquidity, uint256 shortfall);
        function getAssetsIn(address account) external view returns (address[] memory);
        function enterMarkets(address[] memory cTokens) external returns (uint256[] memory);
        function exitMarket(address cToken) external returns (uint256);
        function oracle() external view returns (address);
    }
}

// Fields shared by CEther and CErc20 markets
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface CTokenContract {
        function balanceOfUnderlying(address owner) external returns (uint256);
        function borrowBalanceCurrent(address account) external returns (uint256);
        function borrow(uint256 borrowAmount) external returns (uint256);
        function underlying() external view returns (address);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface CErc20Contract {
        function mint(uint256 mintAmount) external returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface CEtherContract {
        function mint() external payable;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface PriceOracleContract {
        function getUnderlyingPrice(address cToken) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface Erc20Contract {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
